use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,

    #[envconfig(from = "BIND_ADDR", default = "127.0.0.1:8080")]
    pub bind_addr: String,

    #[envconfig(from = "JWT_SECRET")]
    pub jwt_secret: String,

    #[envconfig(from = "JWT_TTL_HOURS", default = "24")]
    pub jwt_ttl_hours: i64,

    #[envconfig(from = "STRIPE_SECRET_KEY")]
    pub stripe_secret_key: String,

    #[envconfig(from = "STRIPE_WEBHOOK_SECRET")]
    pub stripe_webhook_secret: String,

    #[envconfig(
        from = "CHECKOUT_SUCCESS_URL",
        default = "http://localhost:3000/checkout/success"
    )]
    pub checkout_success_url: String,

    #[envconfig(
        from = "CHECKOUT_CANCEL_URL",
        default = "http://localhost:3000/checkout/cancel"
    )]
    pub checkout_cancel_url: String,

    /// Cart items older than this are removed by the background sweeper.
    #[envconfig(from = "CART_MAX_AGE_DAYS", default = "14")]
    pub cart_max_age_days: i64,
}
