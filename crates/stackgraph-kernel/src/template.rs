//! Deployment template rendering
//!
//! Turns ordered descriptors into a `Resources` map the deployment engine
//! understands. Resources are keyed by [`LogicalId::template_key`].
//! Functions get a companion execution role carrying their inline policy.

use crate::descriptor::ResourceDescriptor;
use crate::plan::DependencyEdge;
use crate::types::ResourceType;
use serde_json::{json, Map, Value};
use stackgraph_policy::{LogicalId, PolicyDocument, Principal};

/// Template format version stamped on every rendering
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Managed policy attached to every function execution role
pub const BASIC_EXECUTION_POLICY: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";

/// Template key of the execution role emitted for `function_id`
#[must_use]
pub fn service_role_key(function_id: &LogicalId) -> String {
    format!("{}ServiceRole", function_id.template_key())
}

/// Render descriptors (already in realization order) as a template
#[must_use]
pub fn render(stack_name: &str, steps: &[ResourceDescriptor], edges: &[DependencyEdge]) -> Value {
    let mut resources = Map::new();
    let mut order = Vec::with_capacity(steps.len());

    for descriptor in steps {
        let key = descriptor.logical_id().template_key();
        let mut properties: Map<String, Value> = descriptor
            .properties()
            .iter()
            .map(|(k, v)| (k.clone(), v.to_template()))
            .collect();
        let mut depends_on: Vec<String> = edges
            .iter()
            .filter(|e| e.from == *descriptor.logical_id())
            .map(|e| e.to.template_key())
            .collect();

        match descriptor.resource_type() {
            ResourceType::Function => {
                let role_key = service_role_key(descriptor.logical_id());
                resources.insert(
                    role_key.clone(),
                    execution_role(descriptor.policy(), &format!("{key}Policy")),
                );
                order.push(role_key.clone());
                properties.insert("Role".into(), json!({ "Fn::GetAtt": [role_key, "Arn"] }));
                depends_on.push(role_key);
            }
            ResourceType::Role => {
                if let Some(policy) = descriptor.policy().filter(|p| !p.is_empty()) {
                    properties.insert("Policies".into(), inline_policies(policy, &format!("{key}Policy")));
                }
            }
            ResourceType::LogGroup | ResourceType::Bucket | ResourceType::DeliveryStream => {}
        }

        let mut entry = Map::new();
        entry.insert("Type".into(), json!(descriptor.resource_type().template_type()));
        entry.insert("Properties".into(), Value::Object(properties));
        if !depends_on.is_empty() {
            depends_on.sort();
            entry.insert("DependsOn".into(), json!(depends_on));
        }
        resources.insert(key.clone(), Value::Object(entry));
        order.push(key);
    }

    json!({
        "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
        "Description": format!("Stack {stack_name}"),
        "Metadata": { "RealizationOrder": order },
        "Resources": resources,
    })
}

fn inline_policies(policy: &PolicyDocument, name: &str) -> Value {
    json!([{ "PolicyName": name, "PolicyDocument": policy.to_template() }])
}

fn execution_role(policy: Option<&PolicyDocument>, policy_name: &str) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "AssumeRolePolicyDocument".into(),
        Principal::service("lambda.amazonaws.com").assume_role_document(),
    );
    properties.insert("ManagedPolicyArns".into(), json!([BASIC_EXECUTION_POLICY]));
    if let Some(policy) = policy.filter(|p| !p.is_empty()) {
        properties.insert("Policies".into(), inline_policies(policy, policy_name));
    }
    json!({ "Type": "AWS::IAM::Role", "Properties": properties })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_stack_has_no_resources() {
        let template = render("MyTestStack", &[], &[]);
        assert_eq!(template["Resources"], json!({}));
        assert_eq!(template["AWSTemplateFormatVersion"], TEMPLATE_FORMAT_VERSION);
    }

    #[test]
    fn test_function_gets_execution_role() {
        let func = ResourceDescriptor::new("Processor", ResourceType::Function)
            .with_property("Runtime", "nodejs12.x");
        let template = render("Stack", &[func], &[]);

        assert_eq!(
            template["Resources"]["Processor"]["Properties"]["Role"],
            json!({ "Fn::GetAtt": ["ProcessorServiceRole", "Arn"] })
        );
        assert_eq!(
            template["Resources"]["ProcessorServiceRole"]["Type"],
            "AWS::IAM::Role"
        );
        assert_eq!(
            template["Metadata"]["RealizationOrder"],
            json!(["ProcessorServiceRole", "Processor"])
        );
    }

    #[test]
    fn test_depends_on_from_edges() {
        let bucket = ResourceDescriptor::new("Bucket", ResourceType::Bucket);
        let role = ResourceDescriptor::new("Role", ResourceType::Role);
        let edges = vec![DependencyEdge {
            from: LogicalId::new("Role"),
            to: LogicalId::new("Bucket"),
        }];
        let template = render("Stack", &[bucket, role], &edges);
        assert_eq!(template["Resources"]["Role"]["DependsOn"], json!(["Bucket"]));
        assert!(template["Resources"]["Bucket"].get("DependsOn").is_none());
    }

    #[test]
    fn test_keys_drop_separators_everywhere() {
        let bucket = ResourceDescriptor::new("log-bucket", ResourceType::Bucket)
            .with_property("BucketName", "log-bucket");
        let func = ResourceDescriptor::new("log_processor", ResourceType::Function);
        let edges = vec![DependencyEdge {
            from: LogicalId::new("log_processor"),
            to: LogicalId::new("log-bucket"),
        }];
        let template = render("Stack", &[bucket, func], &edges);

        assert_eq!(template["Resources"]["logbucket"]["Properties"]["BucketName"], "log-bucket");
        assert_eq!(
            template["Resources"]["logprocessor"]["DependsOn"],
            json!(["logbucket", "logprocessorServiceRole"])
        );
        assert_eq!(
            template["Metadata"]["RealizationOrder"],
            json!(["logbucket", "logprocessorServiceRole", "logprocessor"])
        );
    }
}
