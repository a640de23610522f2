use nix::errno::Errno;
use std::io;

/// The platform's description of an I/O error, without the "(os error N)" suffix
/// that `io::Error`'s `Display` appends.
pub fn os_message(err: &io::Error) -> String {
    match err.raw_os_error() {
        Some(code) => Errno::from_raw(code).desc().to_string(),
        None => err.to_string(),
    }
}
