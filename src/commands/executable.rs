use crate::commands::CommandError;
use crate::frame::Frame;
use crate::store::Store;

pub trait Executable {
    /// Runs the command against `store`. The store lock is taken at most once, so the whole
    /// command is atomic with respect to every other command.
    fn exec(self, store: Store) -> Result<Frame, CommandError>;
}
