pub mod nameserver;
pub mod net;
pub mod resolv_conf;
