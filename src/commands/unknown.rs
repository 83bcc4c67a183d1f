use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;

/// Any command outside the supported set. It is answered with an empty bulk string rather than
/// an error.
#[derive(Debug, PartialEq)]
pub struct Unknown {
    pub name: String,
}

impl Executable for Unknown {
    fn exec(self, _store: Store) -> Frame {
        Frame::Bulk(Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    #[test]
    fn replies_with_empty_bulk() {
        let frame = Frame::Array(vec![
            Frame::Bulk(Bytes::from("FOOO")),
            Frame::Bulk(Bytes::from("bar")),
        ]);
        let cmd = Command::try_from(frame).unwrap();

        assert_eq!(
            cmd,
            Command::Unknown(Unknown {
                name: "fooo".to_string()
            })
        );
        assert_eq!(cmd.exec(Store::new()), Frame::Bulk(Bytes::new()));
    }
}
