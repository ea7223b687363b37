//! Declaration Validator
//!
//! Performs all checks at declaration time, before anything is inserted.
//! Synthesis only re-checks acyclicity.

use crate::descriptor::{ResourceDescriptor, ResourceHandle};
use crate::error::StackError;
use crate::template::service_role_key;
use crate::types::ResourceType;
use indexmap::IndexMap;
use stackgraph_policy::{LogicalId, PolicyDocument};

/// Read-only view of the declared descriptors
pub struct DeclarationValidator<'a> {
    declared: &'a IndexMap<LogicalId, ResourceDescriptor>,
}

impl<'a> DeclarationValidator<'a> {
    /// Validate against the descriptors declared so far
    pub fn new(declared: &'a IndexMap<LogicalId, ResourceDescriptor>) -> Self {
        Self { declared }
    }

    /// Id must be well-formed and its template keys not yet taken
    ///
    /// A descriptor claims its own template key, and a function also claims
    /// the key of its generated execution role.
    pub fn check_identifier(
        &self,
        id: &LogicalId,
        resource_type: ResourceType,
    ) -> Result<(), StackError> {
        if !id.is_well_formed() {
            return Err(StackError::InvalidIdentifier(id.clone()));
        }

        let mut claimed = vec![id.template_key()];
        if resource_type == ResourceType::Function {
            claimed.push(service_role_key(id));
        }
        let taken = self.declared.values().any(|existing| {
            let key = existing.logical_id().template_key();
            claimed.contains(&key)
                || (existing.resource_type() == ResourceType::Function
                    && claimed.contains(&service_role_key(existing.logical_id())))
        });
        if taken {
            return Err(StackError::DuplicateIdentifier(id.clone()));
        }
        Ok(())
    }

    /// `handle` must name a declared descriptor of kind `expected`
    pub fn check_handle(
        &self,
        referencer: &LogicalId,
        handle: &ResourceHandle,
        expected: ResourceType,
    ) -> Result<(), StackError> {
        let target = self.declared.get(handle.logical_id()).ok_or_else(|| {
            StackError::DanglingReference {
                referencer: referencer.clone(),
                missing: handle.logical_id().clone(),
            }
        })?;

        if target.resource_type() != expected {
            return Err(StackError::TypeMismatch {
                referencer: referencer.clone(),
                target: handle.logical_id().clone(),
                expected,
                found: target.resource_type(),
            });
        }
        Ok(())
    }

    /// Every reference held by `descriptor` must resolve
    pub fn check_references(&self, descriptor: &ResourceDescriptor) -> Result<(), StackError> {
        for reference in descriptor.references() {
            if !self.declared.contains_key(&reference.logical_id) {
                return Err(StackError::DanglingReference {
                    referencer: descriptor.logical_id().clone(),
                    missing: reference.logical_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Every statement needs resources and well-formed actions
    pub fn check_policy(id: &LogicalId, policy: &PolicyDocument) -> Result<(), StackError> {
        policy
            .validate()
            .map_err(|source| StackError::InvalidPolicyStatement {
                logical_id: id.clone(),
                source,
            })
    }

    /// Buffering thresholds must be positive
    pub fn check_buffering(
        id: &LogicalId,
        interval_seconds: u32,
        size_mb: u32,
    ) -> Result<(), StackError> {
        if interval_seconds == 0 {
            return Err(StackError::InvalidBufferingParameter {
                logical_id: id.clone(),
                parameter: "buffer_interval_seconds",
            });
        }
        if size_mb == 0 {
            return Err(StackError::InvalidBufferingParameter {
                logical_id: id.clone(),
                parameter: "buffer_size_mb",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackgraph_policy::{PolicyStatement, StatementError};

    fn declared() -> IndexMap<LogicalId, ResourceDescriptor> {
        let mut map = IndexMap::new();
        map.insert(
            LogicalId::new("Bucket"),
            ResourceDescriptor::new("Bucket", ResourceType::Bucket),
        );
        map
    }

    #[test]
    fn test_identifier_checks() {
        let map = declared();
        let v = DeclarationValidator::new(&map);
        assert!(v.check_identifier(&LogicalId::new("Role"), ResourceType::Role).is_ok());
        assert_eq!(
            v.check_identifier(&LogicalId::new("Bucket"), ResourceType::Role),
            Err(StackError::DuplicateIdentifier(LogicalId::new("Bucket")))
        );
        assert_eq!(
            v.check_identifier(&LogicalId::new(""), ResourceType::Role),
            Err(StackError::InvalidIdentifier(LogicalId::new("")))
        );
    }

    #[test]
    fn test_identifiers_collide_on_template_key() {
        let map = declared();
        let v = DeclarationValidator::new(&map);
        assert_eq!(
            v.check_identifier(&LogicalId::new("Buck-et"), ResourceType::Bucket),
            Err(StackError::DuplicateIdentifier(LogicalId::new("Buck-et")))
        );
    }

    #[test]
    fn test_function_claims_execution_role_key() {
        let mut map = declared();
        map.insert(
            LogicalId::new("Fn"),
            ResourceDescriptor::new("Fn", ResourceType::Function),
        );
        let v = DeclarationValidator::new(&map);
        assert!(matches!(
            v.check_identifier(&LogicalId::new("FnServiceRole"), ResourceType::Role),
            Err(StackError::DuplicateIdentifier(_))
        ));
        assert!(v.check_identifier(&LogicalId::new("Fn2"), ResourceType::Function).is_ok());
    }

    #[test]
    fn test_function_rejected_when_execution_role_key_taken() {
        let mut map = declared();
        map.insert(
            LogicalId::new("FnServiceRole"),
            ResourceDescriptor::new("FnServiceRole", ResourceType::Role),
        );
        let v = DeclarationValidator::new(&map);
        assert_eq!(
            v.check_identifier(&LogicalId::new("Fn"), ResourceType::Function),
            Err(StackError::DuplicateIdentifier(LogicalId::new("Fn")))
        );
        assert!(v.check_identifier(&LogicalId::new("Fn"), ResourceType::Role).is_ok());
    }

    #[test]
    fn test_handle_kind_mismatch() {
        let map = declared();
        let v = DeclarationValidator::new(&map);
        let wrong = ResourceHandle::named(ResourceType::Function, "Bucket");
        let err = v
            .check_handle(&LogicalId::new("Stream"), &wrong, ResourceType::Function)
            .unwrap_err();
        assert_eq!(err.kind(), "type_mismatch");
    }

    #[test]
    fn test_policy_error_names_declaration() {
        let policy = PolicyDocument::from_statements(vec![PolicyStatement::allow().action("s3:GetObject")]);
        let err = DeclarationValidator::check_policy(&LogicalId::new("Role"), &policy).unwrap_err();
        match err {
            StackError::InvalidPolicyStatement { logical_id, source } => {
                assert_eq!(logical_id, LogicalId::new("Role"));
                assert_eq!(source.statement_error(), &StatementError::EmptyResources);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_zero_buffering_rejected() {
        let id = LogicalId::new("Stream");
        assert!(DeclarationValidator::check_buffering(&id, 60, 1).is_ok());
        assert!(matches!(
            DeclarationValidator::check_buffering(&id, 0, 1),
            Err(StackError::InvalidBufferingParameter { parameter: "buffer_interval_seconds", .. })
        ));
        assert!(matches!(
            DeclarationValidator::check_buffering(&id, 60, 0),
            Err(StackError::InvalidBufferingParameter { parameter: "buffer_size_mb", .. })
        ));
    }
}
