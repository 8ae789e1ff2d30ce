use envconfig::Envconfig;

#[derive(Envconfig, Clone, Debug)]
pub struct GwmConfig {
    /// Image used for gateway Deployments when the GatewayClassConfig does
    /// not override it.
    /// Env: OPRC_GWM_IMAGE
    #[envconfig(
        from = "OPRC_GWM_IMAGE",
        default = "ghcr.io/pawissanutt/oaas-rs/gateway:latest"
    )]
    pub gateway_image: String,

    /// Listener port assumed when an EdgeGateway declares none.
    /// Env: OPRC_GWM_LISTENER_PORT
    #[envconfig(from = "OPRC_GWM_LISTENER_PORT", default = "8443")]
    pub default_listener_port: i32,

    /// Field manager name used for server-side apply writes.
    /// Env: OPRC_GWM_FIELD_MANAGER
    #[envconfig(from = "OPRC_GWM_FIELD_MANAGER", default = "oprc-gwm")]
    pub field_manager: String,

    /// Requeue interval after a retryable reconcile failure.
    /// Env: OPRC_GWM_REQUEUE_SECS
    #[envconfig(from = "OPRC_GWM_REQUEUE_SECS", default = "60")]
    pub requeue_secs: u64,
}

impl Default for GwmConfig {
    fn default() -> Self {
        Self {
            gateway_image: "ghcr.io/pawissanutt/oaas-rs/gateway:latest".into(),
            default_listener_port: 8443,
            field_manager: "oprc-gwm".into(),
            requeue_secs: 60,
        }
    }
}
