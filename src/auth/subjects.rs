//! Allow-list of identities a verified token may name, derived from registered entities.

// self
use crate::{_prelude::*, auth::EntityId, error::ConfigError};

/// Identity strings a verified token's subject must belong to.
///
/// An empty set places no restriction on the subject; whether that is acceptable is decided by
/// the verifier configuration, not by this type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AcceptableSubjects(BTreeSet<String>);
impl AcceptableSubjects {
	/// Builds the allow-list from arbitrary identity strings.
	pub fn new<I, S>(subjects: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self(subjects.into_iter().map(Into::into).collect())
	}

	/// Builds the allow-list from the ids of registered entities.
	pub fn from_entities<'a, I>(entities: I) -> Self
	where
		I: IntoIterator<Item = &'a EntityId>,
	{
		Self(entities.into_iter().map(|id| id.as_str().to_owned()).collect())
	}

	/// Adds a subject to the allow-list.
	pub fn insert(&mut self, subject: impl Into<String>) {
		self.0.insert(subject.into());
	}

	/// Returns true when `subject` is on the allow-list.
	pub fn contains(&self, subject: &str) -> bool {
		self.0.contains(subject)
	}

	/// Number of distinct subjects.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no subjects are configured.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over the subjects in sorted order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}
}

/// Checks that a group of registered entities can be told apart.
///
/// A lone entity may omit its id. Once a group holds more than one entity every member must be
/// identified, otherwise requests cannot be routed and subjects cannot be derived.
pub fn validate_group(group: &str, entities: &[Option<EntityId>]) -> Result<(), ConfigError> {
	if entities.len() <= 1 || entities.iter().all(Option::is_some) {
		Ok(())
	} else {
		Err(ConfigError::InvalidEntityGroup { group: group.to_owned() })
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn entity(id: &str) -> EntityId {
		EntityId::new(id).expect("Entity fixture should be valid.")
	}

	#[test]
	fn subjects_are_derived_from_entity_ids() {
		let ids = [entity("kb-docs"), entity("agent-support"), entity("kb-docs")];
		let subjects = AcceptableSubjects::from_entities(ids.iter());

		assert_eq!(subjects.len(), 2);
		assert!(subjects.contains("agent-support"));
		assert!(!subjects.contains("agent-billing"));
		assert_eq!(subjects.iter().collect::<Vec<_>>(), ["agent-support", "kb-docs"]);
	}

	#[test]
	fn group_of_identified_entities_is_valid() {
		validate_group("Agents", &[Some(entity("1")), Some(entity("2"))])
			.expect("Fully identified group should pass.");
		validate_group("Agents", &[None]).expect("A single anonymous entity should pass.");
		validate_group("Agents", &[]).expect("An empty group should pass.");
	}

	#[test]
	fn group_with_anonymous_member_is_rejected() {
		let err = validate_group("Knowledge bases", &[None, Some(entity("1")), Some(entity("2"))])
			.expect_err("Mixed group should be rejected.");

		assert!(matches!(err, ConfigError::InvalidEntityGroup { ref group } if group == "Knowledge bases"));
	}

	#[test]
	fn serializes_as_plain_array() {
		let subjects = AcceptableSubjects::new(["b", "a"]);

		assert_eq!(
			serde_json::to_string(&subjects).expect("Subjects should serialize."),
			"[\"a\",\"b\"]"
		);
	}
}
