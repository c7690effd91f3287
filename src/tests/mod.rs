mod key;
pub(crate) mod util;
