#[macro_export]
macro_rules! validate {
    ($assert:expr, $err:expr) => {{
        if ($assert) {
            Ok::<(), $crate::error::VaultClientError>(())
        } else {
            let error = $err;
            tracing::error!("Error {} thrown at {}:{}", error, file!(), line!());
            Err(error)
        }
    }};

    ($assert:expr, $err:expr, $($arg:tt)+) => {{
        if ($assert) {
            Ok::<(), $crate::error::VaultClientError>(())
        } else {
            let error = $err;
            tracing::error!("Error {} thrown at {}:{}", error, file!(), line!());
            tracing::error!($($arg)+);
            Err(error)
        }
    }};
}
