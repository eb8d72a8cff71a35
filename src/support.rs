//! Small file/conversion helpers shared by the config and lock modules.

use std::{convert::TryInto, fmt::Display, fs, path, str::from_utf8};

use serde::de::DeserializeOwned;

use crate::{err_at, error::Result};

pub(crate) fn try_convert_int<T, U>(from: T, msg: &str) -> Result<U>
where
    T: Copy + Display + TryInto<U>,
{
    match from.try_into() {
        Ok(to) => Ok(to),
        Err(_) => err_at!(FailConvert, msg: "{} for {}", msg, from),
    }
}

/// Load a toml file and parse it into `T`.
pub fn load_toml<P, T>(loc: P) -> Result<T>
where
    P: AsRef<path::Path>,
    T: DeserializeOwned,
{
    let ploc: &path::Path = loc.as_ref();
    let data = err_at!(IoError, fs::read(ploc))?;
    let s = err_at!(FailConvert, from_utf8(&data))?;
    err_at!(DecodeFail, toml::from_str(s))
}
