pub mod inspector;
pub mod mint;
pub mod rpc;
pub mod wallet;

pub use inspector::OnchainInspector;
pub use rpc::SolanaClient;
pub use wallet::WalletManager;
