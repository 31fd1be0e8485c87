mod cursor;
pub(crate) mod util;
