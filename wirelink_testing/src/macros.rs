//! Assertion macro shared by test helpers and integration tests.

/// Await a read future under a two second timeout and panic with contextual
/// diagnostics if it times out or fails.
#[macro_export]
macro_rules! recv_expect {
    ($fut:expr) => {{
        ::tokio::time::timeout(::std::time::Duration::from_secs(2), $fut)
            .await
            .expect(concat!("recv timed out at ", file!(), ":", line!()))
            .expect(concat!("recv failed at ", file!(), ":", line!()))
    }};
    ($fut:expr, $msg:expr) => {{
        let m = ::std::format!("{msg} at {}:{}", file!(), line!(), msg = $msg);
        ::tokio::time::timeout(::std::time::Duration::from_secs(2), $fut)
            .await
            .expect(&m)
            .expect(&m)
    }};
}

pub use crate::recv_expect;
