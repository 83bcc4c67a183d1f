use crate::frame::Frame;
use crate::store::Store;

pub trait Executable {
    fn exec(self, store: Store) -> Frame;
}
