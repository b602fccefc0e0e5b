use serde::{Deserialize, Serialize};

/// A person or organization related to a package (author, owner, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    #[serde(rename = "type", default)]
    pub party_type: Option<PartyType>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyType {
    Person,
    Organization,
}

impl Party {
    pub fn person(role: &str, name: Option<String>, email: Option<String>) -> Self {
        Self {
            party_type: Some(PartyType::Person),
            role: Some(role.to_string()),
            name,
            email,
            url: None,
        }
    }

    /// A party whose type is not known from the datafile.
    pub fn untyped(role: &str, name: Option<String>) -> Self {
        Self {
            party_type: None,
            role: Some(role.to_string()),
            name,
            email: None,
            url: None,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }
}

impl std::fmt::Display for PartyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Person => write!(f, "person"),
            Self::Organization => write!(f, "organization"),
        }
    }
}
