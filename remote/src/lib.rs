//! Remote side of xferbench
//!
//! The benchmark talks to the remote host only through the [`Channel`] trait:
//!
//! - [`ssh`]: channels over an `openssh` session, one per strategy run
//! - [`loopback`]: channels that treat the local filesystem as the remote host
//! - [`dialect`]: remote command syntax for POSIX shells and Windows PowerShell
//! - [`dirs`]: clearing, creating and extracting into remote directories
//! - [`path`]: '/'-separated remote path manipulation
//!
//! # Example
//!
//! ```rust,no_run
//! use remote::{Connector, RemoteDirs};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let connector = remote::LoopbackConnector;
//! let channel = connector.connect().await?;
//! RemoteDirs::new(channel.as_ref()).prepare_root("/tmp/upload").await?;
//! channel.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod channel;
pub mod dialect;
pub mod dirs;
pub mod loopback;
pub mod path;
pub mod ssh;

pub use channel::{
    Channel, ChannelConfig, ChannelError, CommandOutput, Connector, RemoteMetadata, put_error,
};
pub use dialect::Dialect;
pub use dirs::{CreatedDirs, RemoteDirs};
pub use loopback::{LoopbackChannel, LoopbackConnector};
pub use ssh::{SshConnector, SshTarget};
