//! Destination terminals and the feeder shuttle stop.
//!
//! Lookup keys are normalized: the text before the first `(`, trimmed,
//! lower-cased, with common Spanish accents folded.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Terminal {
    pub name: String,
    /// `(lat, lng)`.
    pub location: (f64, f64),
    /// Route half of each van through the shared shuttle.
    pub feeder_mode: bool,
}

impl Terminal {
    pub fn new(name: impl Into<String>, location: (f64, f64), feeder_mode: bool) -> Self {
        Self {
            name: name.into(),
            location,
            feeder_mode,
        }
    }
}

/// Meeting point where feeder passengers board the shuttle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShuttleStop {
    pub label: String,
    pub location: (f64, f64),
}

/// Metro Cerrillos, Av. Departamental corner Av. Pedro Aguirre Cerda.
pub fn default_shuttle_stop() -> ShuttleStop {
    ShuttleStop {
        label: "Shuttle stop - Av. Departamental / Av. Pedro Aguirre Cerda".to_string(),
        location: (-33.48343, -70.69556),
    }
}

/// Normalize a terminal name into a registry key.
pub fn normalize_name(name: &str) -> String {
    let head = name.split('(').next().unwrap_or_default();
    head.trim().to_lowercase().chars().map(fold_accent).collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'ä' | 'â' => 'a',
        'é' | 'è' | 'ë' | 'ê' => 'e',
        'í' | 'ì' | 'ï' | 'î' => 'i',
        'ó' | 'ò' | 'ö' | 'ô' => 'o',
        'ú' | 'ù' | 'ü' | 'û' => 'u',
        'ñ' => 'n',
        other => other,
    }
}

/// Loose feeder policy: does the normalized name mention any keyword?
pub fn matches_feeder_keyword(name: &str, keywords: &[String]) -> bool {
    let key = normalize_name(name);
    keywords
        .iter()
        .any(|keyword| key.contains(normalize_name(keyword).as_str()))
}

#[derive(Debug, Clone)]
pub struct TerminalRegistry {
    terminals: HashMap<String, Terminal>,
    feeder_keywords: Vec<String>,
    shuttle_stop: ShuttleStop,
}

impl Default for TerminalRegistry {
    fn default() -> Self {
        Self::new(default_shuttle_stop())
    }
}

impl TerminalRegistry {
    /// Empty registry.
    pub fn new(shuttle_stop: ShuttleStop) -> Self {
        Self {
            terminals: HashMap::new(),
            feeder_keywords: Vec::new(),
            shuttle_stop,
        }
    }

    /// Registry pre-loaded with the known Santiago terminals.
    pub fn santiago() -> Self {
        let conquistador = (-33.51505, -70.8044);
        let mut registry = Self::default().with_feeder_keyword("maipu");
        registry.insert(Terminal::new("Terminal Conquistador", conquistador, false));
        registry.insert(Terminal::new("Terminal Maipú", conquistador, true));
        registry.insert(Terminal::new("Terminal Aeropuerto T1", (-33.3928, -70.7856), false));
        registry.insert(Terminal::new("Terminal Aeropuerto T2", (-33.3935, -70.7865), false));
        registry
    }

    pub fn with_feeder_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.feeder_keywords.push(keyword.into());
        self
    }

    pub fn insert(&mut self, terminal: Terminal) {
        self.terminals.insert(normalize_name(&terminal.name), terminal);
    }

    pub fn shuttle_stop(&self) -> &ShuttleStop {
        &self.shuttle_stop
    }

    pub fn len(&self) -> usize {
        self.terminals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terminals.is_empty()
    }

    /// Resolve a terminal by (loosely formatted) name.
    ///
    /// The returned terminal keeps the caller's spelling and has its feeder
    /// flag widened by the keyword policy.
    pub fn resolve(&self, name: &str) -> Option<Terminal> {
        let known = self.terminals.get(&normalize_name(name))?;
        Some(Terminal {
            name: name.trim().to_string(),
            location: known.location,
            feeder_mode: known.feeder_mode || matches_feeder_keyword(name, &self.feeder_keywords),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_parenthetical_and_case() {
        assert_eq!(
            normalize_name("  Terminal Conquistador (Av. 5 Poniente 1601, Maipú) "),
            "terminal conquistador"
        );
        assert_eq!(normalize_name("TERMINAL MAIPÚ"), "terminal maipu");
    }

    #[test]
    fn test_resolve_known_terminal() {
        let registry = TerminalRegistry::santiago();
        let terminal = registry.resolve("terminal aeropuerto t1").unwrap();
        assert_eq!(terminal.location, (-33.3928, -70.7856));
        assert!(!terminal.feeder_mode);
        assert_eq!(terminal.name, "terminal aeropuerto t1");
    }

    #[test]
    fn test_accent_variants_share_entry() {
        let registry = TerminalRegistry::santiago();
        let plain = registry.resolve("Terminal Maipu").unwrap();
        let accented = registry.resolve("Terminal Maipú (Av. 5 Poniente)").unwrap();
        assert_eq!(plain.location, accented.location);
        assert!(plain.feeder_mode && accented.feeder_mode);
    }

    #[test]
    fn test_unknown_terminal() {
        assert!(TerminalRegistry::santiago().resolve("Terminal Norte").is_none());
    }

    #[test]
    fn test_feeder_keyword_widens_flag() {
        let mut registry = TerminalRegistry::default().with_feeder_keyword("maipu");
        registry.insert(Terminal::new("Depot Maipú Sur", (-33.5, -70.75), false));
        assert!(registry.resolve("Depot Maipu Sur").unwrap().feeder_mode);
        assert!(!matches_feeder_keyword("Terminal Aeropuerto T1", &["maipu".to_string()]));
    }
}
