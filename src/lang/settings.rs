//! Parse settings string sent by any client.
//!
//! The client is asked for the `tpkarel` section, so keys arrive without that prefix,
//! e.g. `{"format": {"tabSize": 4}}`.  Unknown keys are ignored.

use serde_json;
use crate::DYNERR;
use crate::lang::{update_json_bool,update_json_i64,update_json_string};

#[derive(Clone)]
pub struct Format {
    /// used when the formatting request does not give a tab size
    pub tab_size: i64
}
#[derive(Clone)]
pub struct Completions {
    pub lower_case: bool
}
#[derive(Clone)]
pub struct Workspace {
    /// folder holding TP sources, relative to each workspace folder
    pub tp_root: String,
    /// folder holding KAREL sources, relative to each workspace folder
    pub karel_root: String
}
#[derive(Clone)]
pub struct Settings {
    pub format: Format,
    pub completions: Completions,
    pub workspace: Workspace
}

impl Settings {
    pub fn new() -> Self {
        Self {
            format: Format {
                tab_size: 2
            },
            completions: Completions {
                lower_case: false
            },
            workspace: Workspace {
                tp_root: "tp".to_string(),
                karel_root: "karel".to_string()
            }
        }
    }
    pub fn tab_size(&self) -> usize {
        match self.format.tab_size {
            x if x < 1 => 1,
            x => x as usize
        }
    }
}

pub fn parse(json: &str) -> Result<Settings,DYNERR> {
    let mut ans = Settings::new();
    let root = serde_json::from_str::<serde_json::Value>(json)?;
    if let Some(obj) = root.as_object() {
        for (key,val) in obj {
            match key.as_str() {
                "format" => {
                    update_json_i64(val,"tabSize",&mut ans.format.tab_size);
                },
                "completions" => {
                    update_json_bool(val,"lowerCase",&mut ans.completions.lower_case);
                },
                "workspace" => {
                    update_json_string(val,"tpRoot",&mut ans.workspace.tp_root);
                    update_json_string(val,"karelRoot",&mut ans.workspace.karel_root);
                },
                _ => {}
            }
        }
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    #[test]
    fn partial_settings() {
        let ans = super::parse(r#"{"format": {"tabSize": 4}, "workspace": {"karelRoot": "src"}, "other": 1}"#).expect("parse failed");
        assert_eq!(ans.tab_size(),4);
        assert_eq!(ans.workspace.tp_root,"tp");
        assert_eq!(ans.workspace.karel_root,"src");
        assert!(!ans.completions.lower_case);
    }
    #[test]
    fn bad_values_ignored() {
        let ans = super::parse(r#"{"format": {"tabSize": "wide"}, "completions": {"lowerCase": true}}"#).expect("parse failed");
        assert_eq!(ans.tab_size(),2);
        assert!(ans.completions.lower_case);
        assert!(super::parse("not json").is_err());
    }
}
