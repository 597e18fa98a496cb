// cvar.rs — dynamic variable tracking

use std::collections::HashMap;

use log::warn;

pub const CVAR_ARCHIVE: i32 = 1; // written to config on save
pub const CVAR_NOSET: i32 = 8; // engine-owned, not settable from console
pub const CVAR_CHEAT: i32 = 32; // locked to default unless cheats enabled

/// A console variable.
#[derive(Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: i32,
    pub modified: bool,
    pub value: f32,
}

/// The full cvar system context.
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

impl Default for CvarContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CvarContext {
    pub fn new() -> Self {
        Self {
            cvar_vars: Vec::new(),
            cvar_index: HashMap::new(),
        }
    }

    /// Find a cvar by name, returning its index. O(1) via HashMap.
    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    /// Find a cvar by name. O(1) via HashMap.
    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Find a cvar by name (mutable). O(1) via HashMap.
    pub fn find_var_mut(&mut self, name: &str) -> Option<&mut Cvar> {
        if let Some(&idx) = self.cvar_index.get(name) {
            Some(&mut self.cvar_vars[idx])
        } else {
            None
        }
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        match self.find_var(name) {
            Some(var) => var.value,
            None => 0.0,
        }
    }

    /// Get the string value of a cvar. Returns "" if not found.
    pub fn variable_string(&self, name: &str) -> &str {
        match self.find_var(name) {
            Some(var) => &var.string,
            None => "",
        }
    }

    /// Register a cvar, or add flags to an existing one. Returns its handle.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> usize {
        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return idx;
        }

        let float_val = value.parse::<f32>().unwrap_or(0.0);
        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            modified: true,
            value: float_val,
        });
        self.cvar_index.insert(name.to_string(), idx);
        idx
    }

    /// Set a cvar from the console or a config file.
    pub fn set(&mut self, name: &str, value: &str) -> Option<usize> {
        let Some(idx) = self.find_var_index(name) else {
            // create it
            return Some(self.get(name, value, 0));
        };

        let var = &mut self.cvar_vars[idx];
        if var.flags & CVAR_NOSET != 0 {
            warn!("{} is write protected", name);
            return Some(idx);
        }

        if var.string == value {
            return Some(idx);
        }

        var.modified = true;
        var.string = value.to_string();
        var.value = value.parse::<f32>().unwrap_or(0.0);
        Some(idx)
    }

    /// Set a cvar to a float value.
    pub fn set_value(&mut self, name: &str, value: f32) {
        let s = if value == value as i32 as f32 {
            format!("{}", value as i32)
        } else {
            format!("{}", value)
        };
        self.set(name, &s);
    }

    /// Value lookup by handle returned from `get`.
    pub fn value_by_handle(&self, handle: usize) -> f32 {
        self.cvar_vars.get(handle).map(|v| v.value).unwrap_or(0.0)
    }

    /// Any cvar modified since the flag was last cleared?
    pub fn check_modified(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        for var in &mut self.cvar_vars {
            if var.modified {
                var.modified = false;
                out.push(var.name.clone());
            }
        }
        out
    }

    /// Write all CVAR_ARCHIVE variables to a config writer.
    pub fn write_variables(&self, writer: &mut dyn std::io::Write) -> std::io::Result<()> {
        for var in &self.cvar_vars {
            if var.flags & CVAR_ARCHIVE != 0 {
                writeln!(writer, "set {} \"{}\"", var.name, var.string)?;
            }
        }
        Ok(())
    }
}
