//! AWS SDK backed directory.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_iam::types::PolicyScopeType;
use aws_sdk_ssoadmin::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use serde_json::{json, Value};
use tracing::{debug, info};

use idc_model::{
    Account, AccountStatus, AttachedPolicy, CustomerManagedPolicy, Group, OrganizationRoot,
    PermissionSet, PrincipalRef, PrincipalType, User,
};

use crate::directory::{
    ApplicationRecord, DirectoryApi, InstanceRecord, MembershipRecord, OuRecord, Page,
    PolicyRecord, TagRecord,
};
use crate::error::{FetchError, FetchResult};

const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "AccessDeniedException",
    "UnrecognizedClientException",
    "InvalidClientTokenId",
    "ExpiredToken",
    "ExpiredTokenException",
    "UnauthorizedException",
];

const THROTTLE_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "ProvisionedThroughputExceededException",
];

const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFoundException",
    "NoSuchEntity",
    "NoSuchEntityException",
    "ParentNotFoundException",
];

/// Map an SDK error onto the fetch error classes by service error code.
fn classify<E, R>(operation: &str, resource: &str, err: SdkError<E, R>) -> FetchError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err
        .as_service_error()
        .and_then(|e| e.code())
        .map(str::to_string);
    let message = DisplayErrorContext(&err).to_string();

    match code.as_deref() {
        Some(c) if AUTH_CODES.contains(&c) => FetchError::Auth(format!("{}: {}", operation, message)),
        Some(c) if THROTTLE_CODES.contains(&c) => FetchError::throttled(operation),
        Some(c) if NOT_FOUND_CODES.contains(&c) => FetchError::not_found(resource),
        None if message.to_lowercase().contains("credentials") => {
            FetchError::Auth(format!("{}: {}", operation, message))
        }
        _ => FetchError::api(operation, message),
    }
}

fn token(next: Option<&str>) -> Option<String> {
    next.filter(|t| !t.is_empty()).map(str::to_string)
}

fn principal_kind(raw: &str) -> FetchResult<PrincipalType> {
    PrincipalType::from_str(raw).ok_or_else(|| FetchError::InvalidData {
        source_name: "sso-admin".to_string(),
        message: format!("unknown principal type '{}'", raw),
    })
}

/// Convert a DynamoDB attribute into plain JSON.
pub fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => n
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| n.parse::<f64>().map(Value::from))
            .unwrap_or_else(|_| Value::String(n.clone())),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(attribute_to_json).collect()),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                .collect(),
        ),
        AttributeValue::Ss(items) | AttributeValue::Ns(items) => {
            Value::Array(items.iter().cloned().map(Value::String).collect())
        }
        _ => Value::Null,
    }
}

fn encode_scan_key(key: &HashMap<String, AttributeValue>) -> FetchResult<String> {
    let mut out = serde_json::Map::new();
    for (name, value) in key {
        let encoded = match value {
            AttributeValue::S(s) => json!({ "S": s }),
            AttributeValue::N(n) => json!({ "N": n }),
            _ => {
                return Err(FetchError::InvalidData {
                    source_name: "dynamodb".to_string(),
                    message: format!("unsupported key attribute type for '{}'", name),
                })
            }
        };
        out.insert(name.clone(), encoded);
    }
    Ok(Value::Object(out).to_string())
}

fn decode_scan_key(token: &str) -> FetchResult<HashMap<String, AttributeValue>> {
    let invalid = |message: String| FetchError::InvalidData {
        source_name: "dynamodb".to_string(),
        message,
    };

    let parsed: serde_json::Map<String, Value> =
        serde_json::from_str(token).map_err(|e| invalid(format!("invalid scan token: {}", e)))?;

    let mut key = HashMap::new();
    for (name, value) in parsed {
        let attribute = if let Some(s) = value.get("S").and_then(Value::as_str) {
            AttributeValue::S(s.to_string())
        } else if let Some(n) = value.get("N").and_then(Value::as_str) {
            AttributeValue::N(n.to_string())
        } else {
            return Err(invalid(format!("invalid scan token entry '{}'", name)));
        };
        key.insert(name, attribute);
    }
    Ok(key)
}

/// Directory backed by the AWS SDK clients.
pub struct AwsDirectory {
    region: String,
    sso_admin: aws_sdk_ssoadmin::Client,
    identity_store: aws_sdk_identitystore::Client,
    organizations: aws_sdk_organizations::Client,
    iam: aws_sdk_iam::Client,
    dynamodb: aws_sdk_dynamodb::Client,
}

impl AwsDirectory {
    /// Load the default credential chain, optionally pinning the region.
    pub async fn new(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        let region = config
            .region()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "us-east-1".to_string());

        info!(region = %region, "AWS clients initialized");

        Self {
            region,
            sso_admin: aws_sdk_ssoadmin::Client::new(&config),
            identity_store: aws_sdk_identitystore::Client::new(&config),
            organizations: aws_sdk_organizations::Client::new(&config),
            iam: aws_sdk_iam::Client::new(&config),
            dynamodb: aws_sdk_dynamodb::Client::new(&config),
        }
    }
}

#[async_trait]
impl DirectoryApi for AwsDirectory {
    fn region(&self) -> String {
        self.region.clone()
    }

    async fn list_instances(&self, next_token: Option<String>) -> FetchResult<Page<InstanceRecord>> {
        let out = self
            .sso_admin
            .list_instances()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListInstances", "instances", e))?;

        let items = out
            .instances()
            .iter()
            .filter_map(|i| {
                Some(InstanceRecord {
                    arn: i.instance_arn()?.to_string(),
                    identity_store_id: i.identity_store_id()?.to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_users(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<User>> {
        let out = self
            .identity_store
            .list_users()
            .identity_store_id(identity_store_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListUsers", identity_store_id, e))?;

        let items = out
            .users()
            .iter()
            .map(|u| {
                let email = u
                    .emails()
                    .iter()
                    .find(|e| e.primary())
                    .or_else(|| u.emails().first())
                    .and_then(|e| e.value())
                    .map(str::to_string);

                User {
                    id: u.user_id().to_string(),
                    user_name: u.user_name().unwrap_or_default().to_string(),
                    display_name: u.display_name().map(str::to_string),
                    given_name: u.name().and_then(|n| n.given_name()).map(str::to_string),
                    family_name: u.name().and_then(|n| n.family_name()).map(str::to_string),
                    email,
                    scim: !u.external_ids().is_empty(),
                }
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_groups(
        &self,
        identity_store_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Group>> {
        let out = self
            .identity_store
            .list_groups()
            .identity_store_id(identity_store_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListGroups", identity_store_id, e))?;

        let items = out
            .groups()
            .iter()
            .map(|g| Group {
                id: g.group_id().to_string(),
                display_name: g.display_name().unwrap_or_default().to_string(),
                description: g.description().map(str::to_string),
                scim: !g.external_ids().is_empty(),
                members: Default::default(),
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_group_memberships(
        &self,
        identity_store_id: &str,
        group_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<MembershipRecord>> {
        let out = self
            .identity_store
            .list_group_memberships()
            .identity_store_id(identity_store_id)
            .group_id(group_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListGroupMemberships", group_id, e))?;

        let items = out
            .group_memberships()
            .iter()
            .filter_map(|m| {
                let user_id = m.member_id()?.as_user_id().ok()?;
                Some(MembershipRecord {
                    membership_id: m.membership_id().to_string(),
                    user_id: user_id.to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_roots(&self, next_token: Option<String>) -> FetchResult<Page<OrganizationRoot>> {
        let out = self
            .organizations
            .list_roots()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListRoots", "organization roots", e))?;

        let items = out
            .roots()
            .iter()
            .filter_map(|r| {
                Some(OrganizationRoot {
                    id: r.id()?.to_string(),
                    name: r.name().unwrap_or("Root").to_string(),
                    arn: r.arn().map(str::to_string),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_organizational_units(
        &self,
        parent_id: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<OuRecord>> {
        let out = self
            .organizations
            .list_organizational_units_for_parent()
            .parent_id(parent_id)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListOrganizationalUnitsForParent", parent_id, e))?;

        let items = out
            .organizational_units()
            .iter()
            .filter_map(|ou| {
                Some(OuRecord {
                    id: ou.id()?.to_string(),
                    name: ou.name().unwrap_or("UnknownOU").to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    #[allow(deprecated)]
    async fn list_accounts(&self, next_token: Option<String>) -> FetchResult<Page<Account>> {
        let out = self
            .organizations
            .list_accounts()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListAccounts", "accounts", e))?;

        let items = out
            .accounts()
            .iter()
            .filter_map(|a| {
                let status = a
                    .status()
                    .and_then(|s| AccountStatus::from_str(s.as_str()))
                    .unwrap_or(AccountStatus::Suspended);
                Some(Account {
                    id: a.id()?.to_string(),
                    name: a.name().unwrap_or_default().to_string(),
                    email: a.email().unwrap_or_default().to_string(),
                    status,
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_permission_sets(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        let out = self
            .sso_admin
            .list_permission_sets()
            .instance_arn(instance_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListPermissionSets", instance_arn, e))?;

        Ok(Page::new(
            out.permission_sets().to_vec(),
            token(out.next_token()),
        ))
    }

    async fn describe_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<PermissionSet> {
        let out = self
            .sso_admin
            .describe_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|e| classify("DescribePermissionSet", permission_set_arn, e))?;

        let detail = out
            .permission_set()
            .ok_or_else(|| FetchError::not_found(permission_set_arn))?;

        let mut ps = PermissionSet::new(
            permission_set_arn,
            detail.name().unwrap_or_default(),
        );
        ps.description = detail.description().map(str::to_string);
        ps.session_duration = detail.session_duration().map(str::to_string);
        ps.relay_state = detail.relay_state().map(str::to_string);
        Ok(ps)
    }

    async fn get_inline_policy(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
    ) -> FetchResult<Option<String>> {
        let out = self
            .sso_admin
            .get_inline_policy_for_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .send()
            .await
            .map_err(|e| classify("GetInlinePolicyForPermissionSet", permission_set_arn, e))?;

        Ok(out
            .inline_policy()
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string))
    }

    async fn list_managed_policies_in_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<AttachedPolicy>> {
        let out = self
            .sso_admin
            .list_managed_policies_in_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListManagedPoliciesInPermissionSet", permission_set_arn, e))?;

        let items = out
            .attached_managed_policies()
            .iter()
            .filter_map(|p| {
                Some(AttachedPolicy {
                    name: p.name()?.to_string(),
                    arn: p.arn()?.to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_customer_managed_policy_references(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<CustomerManagedPolicy>> {
        let out = self
            .sso_admin
            .list_customer_managed_policy_references_in_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                classify(
                    "ListCustomerManagedPolicyReferencesInPermissionSet",
                    permission_set_arn,
                    e,
                )
            })?;

        let items = out
            .customer_managed_policy_references()
            .iter()
            .map(|r| CustomerManagedPolicy {
                name: r.name().to_string(),
                path: r.path().unwrap_or("/").to_string(),
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_permission_set_tags(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>> {
        let out = self
            .sso_admin
            .list_tags_for_resource()
            .instance_arn(instance_arn)
            .resource_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListTagsForResource", permission_set_arn, e))?;

        let items = out
            .tags()
            .iter()
            .map(|t| TagRecord::new(t.key(), t.value()))
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_accounts_for_provisioned_permission_set(
        &self,
        instance_arn: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<String>> {
        let out = self
            .sso_admin
            .list_accounts_for_provisioned_permission_set()
            .instance_arn(instance_arn)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                classify(
                    "ListAccountsForProvisionedPermissionSet",
                    permission_set_arn,
                    e,
                )
            })?;

        Ok(Page::new(out.account_ids().to_vec(), token(out.next_token())))
    }

    async fn list_account_assignments(
        &self,
        instance_arn: &str,
        account_id: &str,
        permission_set_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>> {
        let out = self
            .sso_admin
            .list_account_assignments()
            .instance_arn(instance_arn)
            .account_id(account_id)
            .permission_set_arn(permission_set_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListAccountAssignments", account_id, e))?;

        let mut items = Vec::new();
        for a in out.account_assignments() {
            let (Some(kind), Some(id)) = (a.principal_type(), a.principal_id()) else {
                continue;
            };
            items.push(PrincipalRef {
                kind: principal_kind(kind.as_str())?,
                id: id.to_string(),
            });
        }

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_aws_managed_policies(
        &self,
        next_token: Option<String>,
    ) -> FetchResult<Page<PolicyRecord>> {
        let out = self
            .iam
            .list_policies()
            .scope(PolicyScopeType::Aws)
            .set_marker(next_token)
            .send()
            .await
            .map_err(|e| classify("ListPolicies", "managed policies", e))?;

        let items = out
            .policies()
            .iter()
            .filter_map(|p| {
                Some(PolicyRecord {
                    name: p.policy_name()?.to_string(),
                    arn: p.arn()?.to_string(),
                    default_version_id: p.default_version_id().map(str::to_string),
                })
            })
            .collect();

        let next = if out.is_truncated() {
            token(out.marker())
        } else {
            None
        };
        Ok(Page::new(items, next))
    }

    async fn get_policy_version_document(
        &self,
        policy_arn: &str,
        version_id: &str,
    ) -> FetchResult<String> {
        let out = self
            .iam
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| classify("GetPolicyVersion", policy_arn, e))?;

        let encoded = out
            .policy_version()
            .and_then(|v| v.document())
            .ok_or_else(|| FetchError::not_found(format!("{} ({})", policy_arn, version_id)))?;

        urlencoding::decode(encoded)
            .map(|doc| doc.into_owned())
            .map_err(|e| FetchError::InvalidData {
                source_name: policy_arn.to_string(),
                message: format!("policy document is not valid UTF-8: {}", e),
            })
    }

    async fn list_applications(
        &self,
        instance_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<ApplicationRecord>> {
        let out = self
            .sso_admin
            .list_applications()
            .instance_arn(instance_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListApplications", instance_arn, e))?;

        let items = out
            .applications()
            .iter()
            .filter_map(|a| {
                Some(ApplicationRecord {
                    name: a.name()?.to_string(),
                    arn: a.application_arn()?.to_string(),
                })
            })
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_application_assignments(
        &self,
        application_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<PrincipalRef>> {
        let out = self
            .sso_admin
            .list_application_assignments()
            .application_arn(application_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListApplicationAssignments", application_arn, e))?;

        let mut items = Vec::new();
        for a in out.application_assignments() {
            items.push(PrincipalRef {
                kind: principal_kind(a.principal_type().as_str())?,
                id: a.principal_id().to_string(),
            });
        }

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn list_tables(&self, next_token: Option<String>) -> FetchResult<Page<String>> {
        let out = self
            .dynamodb
            .list_tables()
            .set_exclusive_start_table_name(next_token)
            .send()
            .await
            .map_err(|e| classify("ListTables", "tables", e))?;

        Ok(Page::new(
            out.table_names().to_vec(),
            token(out.last_evaluated_table_name()),
        ))
    }

    async fn describe_table_arn(&self, table_name: &str) -> FetchResult<String> {
        let out = self
            .dynamodb
            .describe_table()
            .table_name(table_name)
            .send()
            .await
            .map_err(|e| classify("DescribeTable", table_name, e))?;

        out.table()
            .and_then(|t| t.table_arn())
            .map(str::to_string)
            .ok_or_else(|| FetchError::not_found(table_name))
    }

    async fn list_table_tags(
        &self,
        table_arn: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<TagRecord>> {
        let out = self
            .dynamodb
            .list_tags_of_resource()
            .resource_arn(table_arn)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| classify("ListTagsOfResource", table_arn, e))?;

        let items = out
            .tags()
            .iter()
            .map(|t| TagRecord::new(t.key(), t.value()))
            .collect();

        Ok(Page::new(items, token(out.next_token())))
    }

    async fn scan_table(
        &self,
        table_name: &str,
        next_token: Option<String>,
    ) -> FetchResult<Page<Value>> {
        let start_key = next_token.as_deref().map(decode_scan_key).transpose()?;

        let out = self
            .dynamodb
            .scan()
            .table_name(table_name)
            .set_exclusive_start_key(start_key)
            .send()
            .await
            .map_err(|e| classify("Scan", table_name, e))?;

        let items: Vec<Value> = out
            .items()
            .iter()
            .map(|item| {
                Value::Object(
                    item.iter()
                        .map(|(k, v)| (k.clone(), attribute_to_json(v)))
                        .collect(),
                )
            })
            .collect();

        let next = match out.last_evaluated_key() {
            Some(key) if !key.is_empty() => Some(encode_scan_key(key)?),
            _ => None,
        };
        debug!("Scanned {} item(s) from {}", items.len(), table_name);

        Ok(Page::new(items, next))
    }
}
