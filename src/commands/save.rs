use tracing::{error, info};

use crate::commands::executable::Executable;
use crate::commands::{CommandError, CommandParser};
use crate::frame::Frame;
use crate::store::Store;

/// Synchronously writes a snapshot of every key to the configured database file.
///
/// Ref: <https://redis.io/docs/latest/commands/save/>
#[derive(Debug, PartialEq)]
pub struct Save;

impl Executable for Save {
    fn exec(self, store: Store) -> Result<Frame, CommandError> {
        // Blocks the connection's task until the file is synced, like SAVE does in Redis. Only the
        // map clone holds the store lock.
        match store.save() {
            Ok(()) => {
                info!("DB saved on disk");
                Ok(Frame::Simple("OK".to_string()))
            }
            Err(e) => {
                error!(
                    "Failed saving the DB to {}: {}",
                    store.snapshot_path().display(),
                    e
                );
                Err(e.into())
            }
        }
    }
}

impl TryFrom<&mut CommandParser> for Save {
    type Error = CommandError;

    fn try_from(_parser: &mut CommandParser) -> Result<Self, Self::Error> {
        Ok(Self)
    }
}
