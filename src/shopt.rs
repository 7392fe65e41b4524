use std::fs;
use std::mem::discriminant;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ShErr, ShResult};

/// Shell options, addressed from `setopt`/`getopt` by dotted keys such as `core.notify`.
#[derive(Serialize, Clone, Deserialize, Debug, Default, PartialEq)]
#[serde(default)]
pub struct ShOpts {
	pub core: ShOptsCore,
	pub prompt: ShOptsPrompt,
}

#[derive(Serialize, Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ShOptsCore {
	/// Announce finished and stopped background jobs before the next prompt
	pub notify: bool,
}

impl Default for ShOptsCore {
	fn default() -> Self {
		Self { notify: true }
	}
}

#[derive(Serialize, Clone, Deserialize, Debug, PartialEq)]
#[serde(default)]
pub struct ShOptsPrompt {
	pub enabled: bool,
}

impl Default for ShOptsPrompt {
	fn default() -> Self {
		Self { enabled: true }
	}
}

impl ShOpts {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn load(path: &Path) -> ShResult<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|e| ShErr::Config(format!("{}: {}",path.display(),e)))?;
		let opts = serde_json::from_str(&raw)
			.map_err(|e| ShErr::Config(format!("{}: {}",path.display(),e)))?;
		debug!("loaded options from {}",path.display());
		Ok(opts)
	}

	fn pointer(query: &str) -> String {
		format!("/{}",query.replace('.', "/"))
	}

	pub fn get(&self, query: &str) -> ShResult<Value> {
		let root = serde_json::to_value(self)?;
		root.pointer(&Self::pointer(query))
			.filter(|value| !value.is_object())
			.cloned()
			.ok_or_else(|| ShErr::Config(format!("Invalid shopt key: {}",query)))
	}

	/// Sets one option. The new value must have the same JSON type as the old one.
	pub fn set(&mut self, query: &str, value: Value) -> ShResult<()> {
		let mut root = serde_json::to_value(&*self)?;
		let slot = root.pointer_mut(&Self::pointer(query))
			.filter(|slot| !slot.is_object())
			.ok_or_else(|| ShErr::Config(format!("Invalid shopt key: {}",query)))?;
		if discriminant(slot) != discriminant(&value) {
			return Err(ShErr::Config(format!("Invalid value for {}: {}",query,value)))
		}
		*slot = value;
		*self = serde_json::from_value(root)?;
		Ok(())
	}

	/// Parses a value typed at the prompt: JSON if it parses, a plain string otherwise.
	pub fn parse_value(raw: &str) -> Value {
		serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()))
	}
}
