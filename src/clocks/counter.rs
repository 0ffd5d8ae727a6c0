use log::error;

/// A clock counter.
///
/// Incrementing a counter at its maximum leaves it there (and logs an
/// error) in every build profile, instead of panicking or wrapping around.
pub trait Counter: Ord + Clone {
    /// The next value, or `None` at the maximum.
    fn checked_succ(&self) -> Option<Self>;

    fn saturating_succ(&self) -> Self {
        match self.checked_succ() {
            Some(next) => next,
            None => {
                error!("Clock counter saturated at its maximum value");
                self.clone()
            }
        }
    }
}

macro_rules! impl_counter {
    ($($t:ty),*) => {
        $(
            impl Counter for $t {
                fn checked_succ(&self) -> Option<Self> {
                    self.checked_add(1)
                }
            }
        )*
    };
}

impl_counter!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
