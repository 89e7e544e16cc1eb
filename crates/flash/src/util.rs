use std::fmt::Debug;

/// Logging helpers for results whose errors should not abort the caller.
pub trait ResultExt<E> {
    type Ok;

    /// Logs the error at `error` level and discards it.
    fn log_err(self) -> Option<Self::Ok>;

    /// Logs the error at `warn` level and discards it.
    fn warn_on_err(self) -> Option<Self::Ok>;
}

impl<T, E: Debug> ResultExt<E> for Result<T, E> {
    type Ok = T;

    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                log::error!("{}:{}: {:?}", caller.file(), caller.line(), error);
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                log::warn!("{}:{}: {:?}", caller.file(), caller.line(), error);
                None
            }
        }
    }
}

/// Conditional builder methods available on every element.
pub trait FluentBuilder {
    /// Applies `then` when `condition` holds.
    fn when(self, condition: bool, then: impl FnOnce(Self) -> Self) -> Self
    where
        Self: Sized,
    {
        if condition { then(self) } else { self }
    }

    /// Applies `then` to the contained value when `option` is `Some`.
    fn when_some<T>(self, option: Option<T>, then: impl FnOnce(Self, T) -> Self) -> Self
    where
        Self: Sized,
    {
        match option {
            Some(value) => then(self, value),
            None => self,
        }
    }
}
