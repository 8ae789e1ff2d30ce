pub mod edge_gateway;
pub mod gateway_class;

pub use edge_gateway::{EdgeGateway, EdgeGatewaySpec, GatewayIdentity, ListenerSpec};
pub use gateway_class::{
    GatewayClass, GatewayClassConfig, GatewayClassConfigSpec, GatewayClassSpec,
    ParametersRef,
};

pub const GROUP: &str = "oaas.io";
pub const VERSION: &str = "v1alpha1";
