//! Patent classification codes.
//!
//! Two taxonomies appear in the bulk data: CPC (Cooperative Patent
//! Classification, e.g. `H04N21/00`) and USPC (US Patent Classification,
//! e.g. `725/32`). Matching dispatches on the taxonomy kind, so the model
//! is a plain tagged union rather than a trait hierarchy.

use std::fmt;

/// Error from parsing a classification code string
#[derive(Debug)]
pub struct ClassParseError {
    input: String,
    reason: &'static str,
}

impl fmt::Display for ClassParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid classification '{}': {}", self.input, self.reason)
    }
}

impl std::error::Error for ClassParseError {}

fn parse_err(input: &str, reason: &'static str) -> ClassParseError {
    ClassParseError {
        input: input.to_string(),
        reason,
    }
}

/// One classification code in either taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Cpc(CpcCode),
    Uspc(UspcCode),
}

impl Classification {
    /// Whether `candidate` falls under this code.
    ///
    /// A code given at coarse granularity covers everything beneath it:
    /// `H04N` covers `H04N21/2343`, `725` covers `725/32`. A CPC subgroup
    /// of `00` denotes the whole main group. Codes from different
    /// taxonomies never cover each other.
    pub fn covers(&self, candidate: &Classification) -> bool {
        match (self, candidate) {
            (Self::Cpc(wanted), Self::Cpc(code)) => wanted.covers(code),
            (Self::Uspc(wanted), Self::Uspc(code)) => wanted.covers(code),
            _ => false,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpc(code) => write!(f, "CPC {code}"),
            Self::Uspc(code) => write!(f, "USPC {code}"),
        }
    }
}

/// Compare numeric facets ignoring leading zeros (`021` == `21`, `00` == `0`)
fn eq_numeric(a: &str, b: &str) -> bool {
    a.trim_start_matches('0') == b.trim_start_matches('0')
}

/// Compare class facets; numeric classes ignore leading zeros, others
/// (USPC design classes like `D14`, or `PLT`) compare literally.
fn eq_class(a: &str, b: &str) -> bool {
    if a.bytes().all(|b| b.is_ascii_digit()) && b.bytes().all(|b| b.is_ascii_digit()) {
        eq_numeric(a, b)
    } else {
        a == b
    }
}

/// Cooperative Patent Classification code, e.g. `H04N21/2343`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpcCode {
    pub section: char,
    pub class_code: String,
    pub subclass: Option<char>,
    pub main_group: Option<String>,
    pub subgroup: Option<String>,
}

impl CpcCode {
    /// Parse a CPC code from CLI text like `H04N21/00`, `H04N` or `H04`.
    pub fn parse(text: &str) -> Result<Self, ClassParseError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let chars: Vec<char> = compact.chars().collect();

        if chars.len() < 3 {
            return Err(parse_err(text, "too short, expected at least section and class"));
        }

        let section = chars[0].to_ascii_uppercase();
        if !(('A'..='H').contains(&section) || section == 'Y') {
            return Err(parse_err(text, "section must be A-H or Y"));
        }

        if !(chars[1].is_ascii_digit() && chars[2].is_ascii_digit()) {
            return Err(parse_err(text, "class must be two digits"));
        }
        let class_code: String = chars[1..3].iter().collect();

        let mut idx = 3;
        let subclass = if idx < chars.len() && chars[idx].is_ascii_alphabetic() {
            let c = chars[idx].to_ascii_uppercase();
            idx += 1;
            Some(c)
        } else {
            None
        };

        let rest: String = chars[idx..].iter().collect();
        let (main_group, subgroup) = if rest.is_empty() {
            (None, None)
        } else {
            if subclass.is_none() {
                return Err(parse_err(text, "group given without a subclass"));
            }
            match rest.split_once('/') {
                Some((main, sub)) => {
                    if main.is_empty() || !main.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(parse_err(text, "main group must be digits"));
                    }
                    if sub.is_empty() || !sub.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(parse_err(text, "subgroup must be digits"));
                    }
                    (Some(main.to_string()), Some(sub.to_string()))
                }
                None => {
                    if !rest.bytes().all(|b| b.is_ascii_digit()) {
                        return Err(parse_err(text, "main group must be digits"));
                    }
                    (Some(rest), None)
                }
            }
        };

        Ok(Self {
            section,
            class_code,
            subclass,
            main_group,
            subgroup,
        })
    }

    fn covers(&self, code: &CpcCode) -> bool {
        if self.section != code.section || !eq_numeric(&self.class_code, &code.class_code) {
            return false;
        }
        let Some(subclass) = self.subclass else {
            return true;
        };
        if code.subclass != Some(subclass) {
            return false;
        }
        let Some(main_group) = &self.main_group else {
            return true;
        };
        if !code
            .main_group
            .as_deref()
            .is_some_and(|g| eq_numeric(main_group, g))
        {
            return false;
        }
        match self.subgroup.as_deref() {
            // "/00" denotes the whole main group
            None => true,
            Some(sub) if eq_numeric(sub, "0") => true,
            Some(sub) => code.subgroup.as_deref().is_some_and(|s| eq_numeric(sub, s)),
        }
    }
}

impl fmt::Display for CpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.section, self.class_code)?;
        if let Some(subclass) = self.subclass {
            write!(f, "{subclass}")?;
        }
        if let Some(main_group) = &self.main_group {
            write!(f, "{main_group}")?;
        }
        if let Some(subgroup) = &self.subgroup {
            write!(f, "/{subgroup}")?;
        }
        Ok(())
    }
}

/// US Patent Classification code, e.g. `725/32` or `D14/138`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UspcCode {
    pub class_code: String,
    pub subclass: Option<String>,
}

impl UspcCode {
    /// Parse a USPC code from CLI text like `725` or `725/32`.
    pub fn parse(text: &str) -> Result<Self, ClassParseError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(parse_err(text, "empty code"));
        }
        let (class_code, subclass) = match compact.split_once('/') {
            Some((class, sub)) => {
                if class.is_empty() || sub.is_empty() {
                    return Err(parse_err(text, "empty class or subclass"));
                }
                (class.to_uppercase(), Some(sub.to_uppercase()))
            }
            None => (compact.to_uppercase(), None),
        };
        Ok(Self {
            class_code,
            subclass,
        })
    }

    /// Build from the fixed-width `main-classification` text in bulk XML,
    /// where the first three characters are the class and the remainder the
    /// subclass (`"725 32"`, `"D14138"`).
    pub fn from_main_classification(text: &str) -> Result<Self, ClassParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(parse_err(text, "empty code"));
        }
        if text.contains('/') {
            return Self::parse(text);
        }
        if text.len() <= 3 {
            return Ok(Self {
                class_code: text.to_uppercase(),
                subclass: None,
            });
        }
        let (class, sub) = text.split_at(3);
        let sub = sub.trim();
        Ok(Self {
            class_code: class.trim().to_uppercase(),
            subclass: (!sub.is_empty()).then(|| sub.to_uppercase()),
        })
    }

    fn covers(&self, code: &UspcCode) -> bool {
        if !eq_class(&self.class_code, &code.class_code) {
            return false;
        }
        match self.subclass.as_deref() {
            None => true,
            Some(sub) => code.subclass.as_deref().is_some_and(|s| eq_class(sub, s)),
        }
    }
}

impl fmt::Display for UspcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subclass {
            Some(subclass) => write!(f, "{}/{}", self.class_code, subclass),
            None => write!(f, "{}", self.class_code),
        }
    }
}

/// The wanted classification set a record must intersect with
#[derive(Debug, Clone)]
pub struct ClassFilter {
    wanted: Vec<Classification>,
}

impl ClassFilter {
    pub fn new(wanted: Vec<Classification>) -> Self {
        Self { wanted }
    }

    pub fn is_empty(&self) -> bool {
        self.wanted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.wanted.len()
    }

    /// First wanted code that covers `candidate`, if any.
    pub fn first_covering(&self, candidate: &Classification) -> Option<&Classification> {
        self.wanted.iter().find(|w| w.covers(candidate))
    }
}
