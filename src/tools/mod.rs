pub mod log;
pub mod clock;
pub mod text_tools;
pub mod recognition;
pub mod storage;
