use std::{fs::File, io::prelude::*};

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeMap};
use tabled::{Table, Tabled, settings::Style};

/// Certificate authority data observed through the pinned binding
pub const CLUSTER_CA_DATA: &str = "clusterCAData";
/// Certificate authority data observed through the default binding
pub const CLUSTER_CA_DATA_DEFAULT: &str = "clusterCADataDefault";

/// Named results exported by a run
///
/// Keys keep the order they were first exported in. Exporting an existing key
/// replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Outputs {
  entries: Vec<(String, String)>,
}

impl Outputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn export(&mut self, key: impl Into<String>, value: impl Into<String>) {
    let key = key.into();
    let value = value.into();

    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some((_, existing)) => *existing = value,
      None => self.entries.push((key, value)),
    }
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn to_stdout_table(&self) -> String {
    let rows: Vec<OutputRow> = self
      .iter()
      .map(|(key, value)| OutputRow {
        key: key.to_string(),
        value: if value.is_empty() { "<empty>".to_string() } else { value.to_string() },
      })
      .collect();

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    format!("{table}\n")
  }
}

impl Serialize for Outputs {
  fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (key, value) in &self.entries {
      map.serialize_entry(key, value)?;
    }
    map.end()
  }
}

#[derive(Tabled)]
#[tabled(rename_all = "UpperCase")]
struct OutputRow {
  key: String,
  value: String,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, Serialize, Deserialize)]
pub enum Format {
  /// JSON format used for logging or writing to a *.json file
  Json,
  /// YAML format used for writing to a *.yaml file
  Yaml,
  /// Text format used for writing to stdout
  #[default]
  Text,
}

/// Render any serializable value in the requested format
pub fn render<T: Serialize>(value: &T, format: &Format, text: impl FnOnce(&T) -> String) -> Result<String> {
  let rendered = match format {
    Format::Json => serde_json::to_string_pretty(value)?,
    Format::Yaml => serde_yaml::to_string(value)?,
    Format::Text => text(value),
  };

  Ok(rendered)
}

/// Write rendered output to the file provided, or stdout
pub fn write(rendered: &str, filename: &Option<String>) -> Result<()> {
  match filename {
    Some(filename) => {
      let mut file = File::create(filename)?;
      file.write_all(rendered.as_bytes())?;
    }
    None => {
      println!("{rendered}");
    }
  }

  Ok(())
}

pub fn output(outputs: &Outputs, format: &Format, filename: &Option<String>) -> Result<()> {
  let rendered = render(outputs, format, Outputs::to_stdout_table)?;
  write(&rendered, filename)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn export_same_key_keeps_last_value() {
    let mut outputs = Outputs::new();
    outputs.export(CLUSTER_CA_DATA, "first");
    outputs.export(CLUSTER_CA_DATA, "second");

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs.get(CLUSTER_CA_DATA), Some("second"));
  }

  #[test]
  fn overwrite_keeps_original_position() {
    let mut outputs = Outputs::new();
    outputs.export("a", "1");
    outputs.export("b", "2");
    outputs.export("a", "3");

    let keys: Vec<&str> = outputs.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(outputs.get("a"), Some("3"));
  }

  #[test]
  fn distinct_keys_are_not_merged() {
    let mut outputs = Outputs::new();
    outputs.export(CLUSTER_CA_DATA, "");
    outputs.export(CLUSTER_CA_DATA_DEFAULT, "BASE64DATA");

    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs.get(CLUSTER_CA_DATA), Some(""));
    assert_eq!(outputs.get(CLUSTER_CA_DATA_DEFAULT), Some("BASE64DATA"));
    assert_eq!(outputs.get("missing"), None);
  }

  #[test]
  fn json_keeps_insertion_order() {
    let mut outputs = Outputs::new();
    outputs.export(CLUSTER_CA_DATA_DEFAULT, "BASE64DATA");
    outputs.export(CLUSTER_CA_DATA, "");

    let json = serde_json::to_string(&outputs).unwrap();
    insta::assert_snapshot!(json, @r#"{"clusterCADataDefault":"BASE64DATA","clusterCAData":""}"#);
  }

  #[test]
  fn yaml_render() {
    let mut outputs = Outputs::new();
    outputs.export(CLUSTER_CA_DATA, "abc");

    let yaml = render(&outputs, &Format::Yaml, Outputs::to_stdout_table).unwrap();
    assert_eq!(yaml, "clusterCAData: abc\n");
  }

  #[test]
  fn text_table_marks_empty_values() {
    let mut outputs = Outputs::new();
    outputs.export(CLUSTER_CA_DATA, "");
    outputs.export(CLUSTER_CA_DATA_DEFAULT, "BASE64DATA");

    let table = outputs.to_stdout_table();
    assert!(table.contains("KEY"));
    assert!(table.contains("<empty>"));
    assert!(table.contains("BASE64DATA"));
  }

  #[test]
  fn write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("outputs.json");
    write("{}", &Some(path.to_str().unwrap().to_string())).unwrap();
    assert_eq!(std::fs::read_to_string(path).unwrap(), "{}");
  }
}
