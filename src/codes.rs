use std::fs;
use std::io;

use camino::Utf8Path;

use crate::domain::StoreCode;
use crate::error::BackupError;

pub fn load_code_list(path: &Utf8Path) -> Result<Vec<StoreCode>, BackupError> {
    let content = fs::read_to_string(path.as_std_path()).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            BackupError::MissingInput(path.as_std_path().to_path_buf())
        } else {
            BackupError::InputRead {
                path: path.as_std_path().to_path_buf(),
                message: err.to_string(),
            }
        }
    })?;
    Ok(parse_code_list(&content))
}

/// One code per line; blank lines are dropped, file order is kept.
pub fn parse_code_list(content: &str) -> Vec<StoreCode> {
    content
        .lines()
        .map(StoreCode::new)
        .filter(|code| !code.is_empty())
        .collect()
}
