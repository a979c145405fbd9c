
pub enum LogServiceType {
    Register,
    Database,
    Ledger,
    Storage,
    Recognition,
    Other
}
impl LogServiceType {
    fn as_str(&self) -> &'static str {
        match self {
            LogServiceType::Register => "REGISTER",
            LogServiceType::Database => "DATABASE",
            LogServiceType::Ledger => "LEDGER",
            LogServiceType::Storage => "STORAGE",
            LogServiceType::Recognition => "RECOGNITION",
            LogServiceType::Other => "OTHER"
        }
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .try_init();
}

pub fn log_info(service: LogServiceType, message: String) {
    tracing::info!(service = service.as_str(), "{}", message)
}

pub fn log_error(service: LogServiceType, message: String) {
    tracing::error!(service = service.as_str(), "{}", message)
}
