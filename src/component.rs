//! Shared machinery of the builder, provisioner and post-processor
//! factories: settings coercion, command file resolution, required keys
//! and array passthrough.

use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{PacksmithError, PacksmithResult, Section};
use crate::section::{ArrayValue, ComponentSection};
use crate::settings::settings_to_map;
use crate::source::{command_from_slice, is_command_filename};
use crate::template::RawTemplate;

/// How a recognized setting is written to the Packer map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Copied as a string
    Str,
    /// `true` when the value is exactly `true`
    Bool,
    /// Parsed as an integer; a bad value fails the component
    Int,
    /// A command, or a command file whose lines form one command
    Command,
    /// A command list, or a command file whose lines are the list
    CommandList,
    /// A path inside the template, prefixed with the component id when
    /// component strings are enabled
    Path,
}

/// Keys, arrays and requirements a component type understands.
#[derive(Debug)]
pub struct Schema {
    pub required: &'static [&'static str],
    pub keys: &'static [(&'static str, KeyKind)],
    pub arrays: &'static [&'static str],
    /// Arrays of template paths, prefixed like `KeyKind::Path`
    pub path_arrays: &'static [&'static str],
    /// Whether the component connects to the machine over ssh or winrm
    pub communicator: bool,
}

impl Schema {
    fn kind_of(&self, key: &str) -> Option<KeyKind> {
        self.keys
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, kind)| *kind)
    }
}

const SSH_KEYS: &[(&str, KeyKind)] = &[
    ("ssh_bastion_host", KeyKind::Str),
    ("ssh_bastion_password", KeyKind::Str),
    ("ssh_bastion_port", KeyKind::Int),
    ("ssh_bastion_private_key_file", KeyKind::Path),
    ("ssh_bastion_username", KeyKind::Str),
    ("ssh_disable_agent", KeyKind::Bool),
    ("ssh_handshake_attempts", KeyKind::Int),
    ("ssh_host", KeyKind::Str),
    ("ssh_password", KeyKind::Str),
    ("ssh_port", KeyKind::Int),
    ("ssh_private_key_file", KeyKind::Path),
    ("ssh_pty", KeyKind::Bool),
    ("ssh_timeout", KeyKind::Str),
    ("ssh_username", KeyKind::Str),
];

const WINRM_KEYS: &[(&str, KeyKind)] = &[
    ("winrm_host", KeyKind::Str),
    ("winrm_insecure", KeyKind::Bool),
    ("winrm_password", KeyKind::Str),
    ("winrm_port", KeyKind::Int),
    ("winrm_timeout", KeyKind::Str),
    ("winrm_use_ssl", KeyKind::Bool),
    ("winrm_username", KeyKind::Str),
];

fn lookup(keys: &[(&str, KeyKind)], key: &str) -> Option<KeyKind> {
    keys.iter().find(|(name, _)| *name == key).map(|(_, kind)| *kind)
}

/// Transport a remote builder uses to reach the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Communicator {
    Ssh,
    Winrm,
    None,
}

/// One component being translated into its Packer map.
///
/// Setting values are variable-substituted on construction; settings whose
/// value is empty count as unset.
pub struct Component<'a> {
    template: &'a RawTemplate,
    section: Section,
    id: &'a str,
    settings: IndexMap<String, String>,
    arrays: &'a IndexMap<String, ArrayValue>,
    taken: Vec<String>,
    handled_arrays: Vec<String>,
    out: Map<String, Value>,
}

impl<'a> Component<'a> {
    pub fn new(
        template: &'a RawTemplate,
        section: Section,
        id: &'a str,
        type_name: &str,
        config: &'a ComponentSection,
    ) -> Self {
        let mut settings = IndexMap::new();
        for (key, value) in settings_to_map(&config.settings) {
            if value.is_empty() {
                debug!("{} '{}': setting '{}' is unset", section, id, key);
                continue;
            }
            let value = template.replace_variables(&value);
            settings.insert(key, value);
        }

        let mut out = Map::new();
        out.insert("type".to_string(), Value::String(type_name.to_string()));

        Self {
            template,
            section,
            id,
            settings,
            arrays: &config.arrays,
            taken: Vec::new(),
            handled_arrays: Vec::new(),
            out,
        }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    pub fn template(&self) -> &'a RawTemplate {
        self.template
    }

    /// Removes a setting so `emit` will not process it again.
    pub fn take(&mut self, key: &str) -> Option<String> {
        let value = self.settings.shift_remove(key);
        if value.is_some() {
            self.taken.push(key.to_string());
        }
        value
    }

    /// Returns a setting without consuming it.
    pub fn peek(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    /// Marks an array as handled and returns it.
    pub fn take_array(&mut self, name: &str) -> Option<&'a ArrayValue> {
        let value = self.arrays.get(name)?;
        self.handled_arrays.push(name.to_string());
        Some(value)
    }

    /// Returns an array without marking it handled.
    pub fn peek_array(&self, name: &str) -> Option<&'a ArrayValue> {
        self.arrays.get(name)
    }

    /// True when the named array is configured with entries.
    pub fn has_array(&self, name: &str) -> bool {
        self.arrays.get(name).is_some_and(|value| !value.is_empty())
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.out.insert(key.to_string(), value);
    }

    fn is_set(&self, key: &str) -> bool {
        self.settings.contains_key(key) || self.taken.iter().any(|k| k == key)
    }

    /// Fails with the first key in `keys` that is not set.
    pub fn require(&self, keys: &[&str]) -> PacksmithResult<()> {
        match keys.iter().find(|key| !self.is_set(key)) {
            Some(key) => Err(self.missing(key)),
            None => Ok(()),
        }
    }

    pub fn missing(&self, key: &str) -> PacksmithError {
        PacksmithError::RequiredSettingMissing {
            section: self.section,
            id: self.id.to_string(),
            key: key.to_string(),
        }
    }

    pub fn invalid(&self, key: &str, reason: impl Into<String>) -> PacksmithError {
        PacksmithError::InvalidSetting {
            section: self.section,
            id: self.id.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn parse_int(&self, key: &str, value: &str) -> PacksmithResult<i64> {
        value.parse::<i64>().map_err(|source| PacksmithError::InvalidInteger {
            section: self.section,
            id: self.id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            source,
        })
    }

    /// Resolves a command value; command files become their joined lines.
    pub fn command(&self, value: &str) -> PacksmithResult<String> {
        if !is_command_filename(value) {
            return Ok(value.to_string());
        }
        let lines = self
            .template
            .source_finder()
            .commands_from_file(self.id, value)?;
        let command = command_from_slice(&lines);
        if command.is_empty() {
            return Err(PacksmithError::CommandFile {
                id: self.id.to_string(),
                name: value.to_string(),
                reason: "no command found".to_string(),
            });
        }
        Ok(self.template.replace_variables(&command))
    }

    /// Resolves a command list value; command files become their lines.
    pub fn command_list(&self, value: &str) -> PacksmithResult<Vec<String>> {
        if !is_command_filename(value) {
            return Ok(vec![value.to_string()]);
        }
        let lines = self
            .template
            .source_finder()
            .commands_from_file(self.id, value)?;
        if lines.is_empty() {
            return Err(PacksmithError::CommandFile {
                id: self.id.to_string(),
                name: value.to_string(),
                reason: "no commands found".to_string(),
            });
        }
        Ok(lines
            .iter()
            .map(|line| self.template.replace_variables(line))
            .collect())
    }

    /// Path of a resource as it appears in the template.
    pub fn resource_path(&self, value: &str) -> String {
        if Path::new(value).is_absolute() {
            return value.to_string();
        }
        self.template.build_template_resource_path(self.id, value)
    }

    fn to_json(&self, key: &str, value: &str, kind: KeyKind) -> PacksmithResult<Value> {
        Ok(match kind {
            KeyKind::Str => Value::String(value.to_string()),
            KeyKind::Bool => Value::Bool(value == "true"),
            KeyKind::Int => Value::from(self.parse_int(key, value)?),
            KeyKind::Command => Value::String(self.command(value)?),
            KeyKind::CommandList => Value::from(self.command_list(value)?),
            KeyKind::Path => Value::String(self.resource_path(value)),
        })
    }

    fn write(&mut self, key: &str, value: &str, kind: KeyKind) -> PacksmithResult<()> {
        let json = self.to_json(key, value, kind)?;
        self.out.insert(key.to_string(), json);
        Ok(())
    }

    fn communicator(&mut self) -> PacksmithResult<Communicator> {
        let communicator = match self.take("communicator") {
            None => Communicator::Ssh,
            Some(value) => {
                let parsed = match value.as_str() {
                    "ssh" => Communicator::Ssh,
                    "winrm" => Communicator::Winrm,
                    "none" => Communicator::None,
                    other => {
                        return Err(self.invalid(
                            "communicator",
                            format!("'{}' is not one of ssh, winrm, none", other),
                        ))
                    }
                };
                self.set("communicator", Value::String(value));
                parsed
            }
        };
        if communicator == Communicator::Ssh && !self.is_set("ssh_username") {
            return Err(self.missing("ssh_username"));
        }
        Ok(communicator)
    }

    /// Validates required keys, writes every remaining setting and array the
    /// schema recognizes and returns the finished Packer map.
    ///
    /// # Errors
    /// * `PacksmithError::RequiredSettingMissing` if a required key is unset
    /// * `PacksmithError::InvalidInteger` if an integer key does not parse
    /// * `PacksmithError::CommandFile` if a command file cannot be resolved
    pub fn emit(mut self, schema: &Schema) -> PacksmithResult<Map<String, Value>> {
        self.require(schema.required)?;

        let communicator = if schema.communicator {
            Some(self.communicator()?)
        } else {
            None
        };

        let settings = std::mem::take(&mut self.settings);
        for (key, value) in &settings {
            if let Some(kind) = schema.kind_of(key) {
                self.write(key, value, kind)?;
                continue;
            }
            if let Some(comm) = communicator {
                let ssh = lookup(SSH_KEYS, key);
                let winrm = lookup(WINRM_KEYS, key);
                match (comm, ssh, winrm) {
                    (Communicator::Ssh, Some(kind), _) | (Communicator::Winrm, _, Some(kind)) => {
                        self.write(key, value, kind)?;
                        continue;
                    }
                    (_, Some(_), _) | (_, _, Some(_)) => {
                        debug!(
                            "{} '{}': '{}' does not apply to the configured communicator",
                            self.section, self.id, key
                        );
                        continue;
                    }
                    _ => {}
                }
            }
            warn!(
                "{} '{}': unsupported setting '{}' ignored",
                self.section, self.id, key
            );
        }

        for (name, value) in self.arrays {
            if self.handled_arrays.iter().any(|handled| handled == name) {
                continue;
            }
            if schema.path_arrays.contains(&name.as_str()) {
                let paths = self.path_list(name, value)?;
                self.out.insert(name.clone(), Value::from(paths));
            } else if schema.arrays.contains(&name.as_str()) {
                let json = match value {
                    ArrayValue::Override(targets) => self.overrides_to_json(targets, schema)?,
                    _ => self.array_to_json(value),
                };
                self.out.insert(name.clone(), json);
            } else {
                warn!(
                    "{} '{}': unsupported array '{}' ignored",
                    self.section, self.id, name
                );
            }
        }

        Ok(self.out)
    }

    fn path_list(&self, name: &str, value: &ArrayValue) -> PacksmithResult<Vec<String>> {
        let items = match value {
            ArrayValue::String(s) => vec![s.clone()],
            ArrayValue::List(list) => list.clone(),
            _ => return Err(self.invalid(name, "expected a list of paths")),
        };
        Ok(items
            .iter()
            .map(|item| self.resource_path(&self.template.replace_variables(item)))
            .collect())
    }

    /// Converts `override` targets. Target settings are written with the
    /// component's own key kinds, so `expect_disconnect=true` stays a
    /// boolean; keys the component does not know are written as strings.
    fn overrides_to_json(
        &self,
        targets: &IndexMap<String, ComponentSection>,
        schema: &Schema,
    ) -> PacksmithResult<Value> {
        let mut object = Map::new();
        for (target, section) in targets {
            let mut inner = Map::new();
            for (key, value) in settings_to_map(&section.settings) {
                if value.is_empty() {
                    continue;
                }
                let value = self.template.replace_variables(&value);
                let kind = schema
                    .kind_of(&key)
                    .or_else(|| lookup(SSH_KEYS, &key))
                    .or_else(|| lookup(WINRM_KEYS, &key))
                    .unwrap_or(KeyKind::Str);
                let json = self.to_json(&format!("{}.{}", target, key), &value, kind)?;
                inner.insert(key, json);
            }
            for (name, array) in &section.arrays {
                inner.insert(name.clone(), self.array_to_json(array));
            }
            object.insert(target.clone(), Value::Object(inner));
        }
        Ok(Value::Object(object))
    }

    /// Converts an array to JSON, substituting variables in every string.
    ///
    /// Nested `override` settings are written as strings here; `emit` types
    /// them with the component's schema.
    pub fn array_to_json(&self, value: &ArrayValue) -> Value {
        let replace = |s: &String| Value::String(self.template.replace_variables(s));
        match value {
            ArrayValue::String(s) => replace(s),
            ArrayValue::List(list) => Value::Array(list.iter().map(replace).collect()),
            ArrayValue::Nested(lists) => Value::Array(
                lists
                    .iter()
                    .map(|list| Value::Array(list.iter().map(replace).collect()))
                    .collect(),
            ),
            ArrayValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), replace(v)))
                    .collect(),
            ),
            ArrayValue::Override(targets) => {
                let mut object = Map::new();
                for (target, section) in targets {
                    let mut inner = Map::new();
                    for (key, value) in settings_to_map(&section.settings) {
                        if value.is_empty() {
                            continue;
                        }
                        inner.insert(
                            key,
                            Value::String(self.template.replace_variables(&value)),
                        );
                    }
                    for (name, array) in &section.arrays {
                        inner.insert(name.clone(), self.array_to_json(array));
                    }
                    object.insert(target.clone(), Value::Object(inner));
                }
                Value::Object(object)
            }
        }
    }
}
