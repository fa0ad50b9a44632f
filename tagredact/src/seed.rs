//! Sample records used to bootstrap an empty collection.

use bson::Document;
use serde::{Deserialize, Serialize};

use crate::{error::Result, TagScoped};

/// A person record. Each contact entry carries its own tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TagScoped)]
pub struct Person {
    pub name: String,
    #[redact(tags)]
    pub tags: Vec<String>,
    #[redact]
    #[serde(rename = "contact info", default)]
    pub contact_info: Vec<Contact>,
}

/// One way of reaching a person.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TagScoped)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[redact(tags)]
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Person {
    /// Decodes a stored record. Unknown fields such as `_id` are ignored.
    pub fn from_document(document: Document) -> Result<Self> {
        Ok(bson::from_document(document)?)
    }

    pub fn to_document(&self) -> Result<Document> {
        Ok(bson::to_document(self)?)
    }
}

impl Contact {
    fn phone(number: &str, tags: &[&str]) -> Self {
        Self {
            phone: Some(number.to_string()),
            email: None,
            tags: owned(tags),
        }
    }

    fn email(address: &str, tags: &[&str]) -> Self {
        Self {
            phone: None,
            email: Some(address.to_string()),
            tags: owned(tags),
        }
    }
}

fn owned(tags: &[&str]) -> Vec<String> {
    tags.iter().map(ToString::to_string).collect()
}

fn person(name: &str, tags: &[&str], contact_info: Vec<Contact>) -> Person {
    Person {
        name: name.to_string(),
        tags: owned(tags),
        contact_info,
    }
}

/// The three demonstration records.
pub fn sample_people() -> Vec<Person> {
    vec![
        person(
            "Pritam",
            &["HR", "IT"],
            vec![
                Contact::phone("01234 567890", &["MAN", "HR"]),
                Contact::email("pritam@bae.com", &["IT"]),
            ],
        ),
        person(
            "James",
            &["HR", "IT"],
            vec![
                Contact::phone("01234 567890", &["HR", "MAN"]),
                Contact::email("james@bae.com", &["IT"]),
            ],
        ),
        person(
            "Russ",
            &["HR", "IT"],
            vec![
                Contact::phone("01234 567890", &["HR", "MAN"]),
                Contact::email("russell@bae.com", &["IT", "MAN"]),
            ],
        ),
    ]
}

/// [`sample_people`] as store documents.
pub fn sample_documents() -> Result<Vec<Document>> {
    sample_people().iter().map(Person::to_document).collect()
}
