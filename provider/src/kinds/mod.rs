pub mod compute;
pub mod function;
pub mod identity;
pub mod network;
pub mod registry;
pub mod storage;
