//! Snapshot assembly: pagination, retries and bounded fan-out.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use idc_model::{
    AccountAssignment, AccountStatus, ElevatedAccess, Group, ManagedPolicy, OrganizationRoot,
    OrganizationSnapshot, OrganizationalUnit, PermissionSet, PrincipalRef, Snapshot,
    SnapshotValidator, SsoInstance, TeamApplication, TeamTable, User, SNAPSHOT_FORMAT_VERSION,
};

use crate::config::FetchOptions;
use crate::directory::{DirectoryApi, Page, PolicyRecord};
use crate::error::{FetchError, FetchResult};
use crate::retry::with_retry;
use crate::team::{self, has_team_tags, TeamTableKind, TeamTableMatcher, TEAM_APPLICATION_NAME};

/// Deepest OU level below the root that is read.
pub const MAX_OU_DEPTH: u32 = 5;

/// Reads the full Identity Center state into a [`Snapshot`].
pub struct Fetcher {
    api: Arc<dyn DirectoryApi>,
    options: FetchOptions,
}

impl Fetcher {
    pub fn new(api: Arc<dyn DirectoryApi>, options: FetchOptions) -> Self {
        Self { api, options }
    }

    /// Fetch everything. `previous` supplies the managed-policy catalog when
    /// `retain_managed_policies` is set.
    pub async fn fetch(&self, previous: Option<&Snapshot>) -> FetchResult<Snapshot> {
        info!("Fetching IAM Identity Center state");

        let instance = self.fetch_instance().await?;
        info!("Using instance {}", instance.arn);

        let organization = self.fetch_organization().await?;
        let users = self.fetch_users(&instance.identity_store_id).await?;
        let groups = self.fetch_groups(&instance.identity_store_id).await?;
        let permission_sets = self.fetch_permission_sets(&instance.arn).await?;
        let assignments = self
            .fetch_assignments(&instance.arn, &permission_sets, &users, &groups)
            .await?;

        let managed_policies = if self.options.retain_managed_policies {
            let retained = previous
                .map(|s| s.managed_policies.clone())
                .unwrap_or_default();
            info!(
                "Retaining {} managed policies from the previous snapshot",
                retained.len()
            );
            retained
        } else {
            self.fetch_managed_policies().await?
        };

        let elevated_access = if self.options.enable_elevated_access {
            Some(self.fetch_elevated_access(&instance.arn).await)
        } else {
            debug!("Skipping elevated-access data");
            None
        };

        let snapshot = Snapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            fetched_at: Utc::now(),
            instance,
            organization,
            users,
            groups,
            permission_sets,
            assignments,
            managed_policies,
            elevated_access,
        };

        let warnings = SnapshotValidator::validate(&snapshot).into_result()?;
        for warning in warnings {
            debug!("{}", warning);
        }

        info!(
            "Fetched {} users, {} groups, {} permission sets, {} assignments, {} accounts",
            snapshot.users.len(),
            snapshot.groups.len(),
            snapshot.permission_sets.len(),
            snapshot.assignments.len(),
            snapshot.organization.accounts.len()
        );

        Ok(snapshot)
    }

    /// Drain every page of a listing, retrying throttled pages.
    async fn collect_pages<T, F, Fut>(&self, operation: &str, mut call: F) -> FetchResult<Vec<T>>
    where
        F: FnMut(Option<String>) -> Fut,
        Fut: Future<Output = FetchResult<Page<T>>>,
    {
        let mut items = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let current = next_token.take();
            let page = with_retry(&self.options.retry, operation, || call(current.clone())).await?;
            items.extend(page.items);

            match page.next_token {
                Some(token) if Some(&token) != current.as_ref() => next_token = Some(token),
                Some(token) => {
                    return Err(FetchError::InvalidData {
                        source_name: operation.to_string(),
                        message: format!("pagination token '{}' repeated", token),
                    })
                }
                None => break,
            }
        }

        debug!("{}: {} item(s)", operation, items.len());
        Ok(items)
    }

    async fn fetch_instance(&self) -> FetchResult<SsoInstance> {
        let instances = self
            .collect_pages("list_instances", |t| self.api.list_instances(t))
            .await?;

        let first = instances.into_iter().next().ok_or(FetchError::NoInstance)?;
        Ok(SsoInstance {
            arn: first.arn,
            identity_store_id: first.identity_store_id,
            region: self.api.region(),
        })
    }

    async fn fetch_organization(&self) -> FetchResult<OrganizationSnapshot> {
        let roots = self
            .collect_pages("list_roots", |t| self.api.list_roots(t))
            .await?;
        let root: OrganizationRoot = roots
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::not_found("organization root"))?;

        let mut organization = OrganizationSnapshot::new(root.clone());

        let accounts = self
            .collect_pages("list_accounts", |t| self.api.list_accounts(t))
            .await?;
        for account in accounts {
            if account.status == AccountStatus::Active {
                organization.add_account(account);
            } else {
                debug!(
                    "Skipping account {} ({}) with status {}",
                    account.name, account.id, account.status
                );
            }
        }

        let mut frontier = vec![(root.id.clone(), root.name.clone())];
        for depth in 1..=MAX_OU_DEPTH {
            if frontier.is_empty() {
                break;
            }

            let levels: Vec<(String, String, Vec<_>)> = stream::iter(frontier)
                .map(|(parent_id, parent_path)| async move {
                    let children = self
                        .collect_pages("list_organizational_units", |t| {
                            self.api.list_organizational_units(&parent_id, t)
                        })
                        .await?;
                    Ok::<_, FetchError>((parent_id, parent_path, children))
                })
                .buffer_unordered(self.options.concurrency)
                .try_collect()
                .await?;

            frontier = Vec::new();
            for (parent_id, parent_path, children) in levels {
                for child in children {
                    let path = format!("{}/{}", parent_path, child.name);
                    frontier.push((child.id.clone(), path.clone()));
                    organization.add_organizational_unit(OrganizationalUnit {
                        id: child.id,
                        name: child.name,
                        parent_id: parent_id.clone(),
                        path,
                        depth,
                    });
                }
            }
        }

        info!(
            "Fetched {} active accounts and {} organizational units",
            organization.accounts.len(),
            organization.organizational_units.len()
        );
        Ok(organization)
    }

    async fn fetch_users(&self, identity_store_id: &str) -> FetchResult<BTreeMap<String, User>> {
        let listed = self
            .collect_pages("list_users", |t| self.api.list_users(identity_store_id, t))
            .await?;

        let mut users = BTreeMap::new();
        for user in listed {
            if users.contains_key(&user.id) {
                debug!("Duplicate user {} in listing", user.id);
                continue;
            }
            users.insert(user.id.clone(), user);
        }
        Ok(users)
    }

    async fn fetch_groups(&self, identity_store_id: &str) -> FetchResult<BTreeMap<String, Group>> {
        let listed = self
            .collect_pages("list_groups", |t| self.api.list_groups(identity_store_id, t))
            .await?;

        let mut groups = BTreeMap::new();
        for group in listed {
            if groups.contains_key(&group.id) {
                debug!("Duplicate group {} in listing", group.id);
                continue;
            }
            groups.insert(group.id.clone(), group);
        }

        let ids: Vec<String> = groups.keys().cloned().collect();
        let memberships: Vec<(String, Vec<_>)> = stream::iter(ids)
            .map(|group_id| async move {
                let members = self
                    .collect_pages("list_group_memberships", |t| {
                        self.api
                            .list_group_memberships(identity_store_id, &group_id, t)
                    })
                    .await?;
                Ok::<_, FetchError>((group_id, members))
            })
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        for (group_id, members) in memberships {
            if let Some(group) = groups.get_mut(&group_id) {
                for m in members {
                    group.members.insert(m.user_id, m.membership_id);
                }
            }
        }

        Ok(groups)
    }

    async fn fetch_permission_sets(
        &self,
        instance_arn: &str,
    ) -> FetchResult<BTreeMap<String, PermissionSet>> {
        let arns: BTreeSet<String> = self
            .collect_pages("list_permission_sets", |t| {
                self.api.list_permission_sets(instance_arn, t)
            })
            .await?
            .into_iter()
            .collect();

        let detailed: Vec<PermissionSet> = stream::iter(arns)
            .map(|arn| self.fetch_permission_set(instance_arn, arn))
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        info!("Fetched {} permission sets", detailed.len());
        Ok(detailed
            .into_iter()
            .map(|ps| (ps.arn.clone(), ps))
            .collect())
    }

    async fn fetch_permission_set(&self, instance_arn: &str, arn: String) -> FetchResult<PermissionSet> {
        let retry = &self.options.retry;

        let mut ps = with_retry(retry, "describe_permission_set", || {
            self.api.describe_permission_set(instance_arn, &arn)
        })
        .await?;

        let inline = with_retry(retry, "get_inline_policy", || {
            self.api.get_inline_policy(instance_arn, &arn)
        })
        .await?;
        if let Some(raw) = inline {
            let doc: Value = serde_json::from_str(&raw).map_err(|e| FetchError::InvalidData {
                source_name: arn.clone(),
                message: format!("inline policy is not valid JSON: {}", e),
            })?;
            ps.inline_policy = Some(doc);
        }

        ps.managed_policies = self
            .collect_pages("list_managed_policies_in_permission_set", |t| {
                self.api
                    .list_managed_policies_in_permission_set(instance_arn, &arn, t)
            })
            .await?
            .into_iter()
            .collect();

        ps.customer_managed_policies = self
            .collect_pages("list_customer_managed_policy_references", |t| {
                self.api
                    .list_customer_managed_policy_references(instance_arn, &arn, t)
            })
            .await?
            .into_iter()
            .collect();

        ps.tags = self
            .collect_pages("list_permission_set_tags", |t| {
                self.api.list_permission_set_tags(instance_arn, &arn, t)
            })
            .await?
            .into_iter()
            .map(|tag| (tag.key, tag.value))
            .collect();

        debug!("Described permission set {}", ps.name);
        Ok(ps)
    }

    async fn fetch_assignments(
        &self,
        instance_arn: &str,
        permission_sets: &BTreeMap<String, PermissionSet>,
        users: &BTreeMap<String, User>,
        groups: &BTreeMap<String, Group>,
    ) -> FetchResult<BTreeSet<AccountAssignment>> {
        let provisioned: Vec<(String, Vec<String>)> = stream::iter(permission_sets.keys().cloned())
            .map(|ps_arn| async move {
                let accounts = self
                    .collect_pages("list_accounts_for_provisioned_permission_set", |t| {
                        self.api
                            .list_accounts_for_provisioned_permission_set(instance_arn, &ps_arn, t)
                    })
                    .await?;
                Ok::<_, FetchError>((ps_arn, accounts))
            })
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        let pairs: BTreeSet<(String, String)> = provisioned
            .into_iter()
            .flat_map(|(ps_arn, accounts)| {
                accounts
                    .into_iter()
                    .map(move |account_id| (account_id, ps_arn.clone()))
            })
            .collect();

        let listed: Vec<(String, String, Vec<PrincipalRef>)> = stream::iter(pairs)
            .map(|(account_id, ps_arn)| async move {
                let principals = self
                    .collect_pages("list_account_assignments", |t| {
                        self.api
                            .list_account_assignments(instance_arn, &account_id, &ps_arn, t)
                    })
                    .await?;
                Ok::<_, FetchError>((account_id, ps_arn, principals))
            })
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        let mut assignments = BTreeSet::new();
        for (account_id, ps_arn, principals) in listed {
            for principal in principals {
                let known = match principal.kind {
                    idc_model::PrincipalType::User => users.contains_key(&principal.id),
                    idc_model::PrincipalType::Group => groups.contains_key(&principal.id),
                };
                if !known {
                    warn!(
                        "Skipping assignment on {} to unknown {} {}",
                        account_id, principal.kind, principal.id
                    );
                    continue;
                }

                assignments.insert(AccountAssignment {
                    account_id: account_id.clone(),
                    permission_set_arn: ps_arn.clone(),
                    principal,
                });
            }
        }

        info!("Fetched {} account assignments", assignments.len());
        Ok(assignments)
    }

    async fn fetch_managed_policies(&self) -> FetchResult<BTreeMap<String, ManagedPolicy>> {
        let listed = self
            .collect_pages("list_aws_managed_policies", |t| {
                self.api.list_aws_managed_policies(t)
            })
            .await?;

        let policies: Vec<ManagedPolicy> = stream::iter(listed)
            .map(|record| self.fetch_managed_policy(record))
            .buffer_unordered(self.options.concurrency)
            .try_collect()
            .await?;

        info!("Fetched {} AWS managed policies", policies.len());
        Ok(policies
            .into_iter()
            .map(|p| (p.arn.clone(), p))
            .collect())
    }

    async fn fetch_managed_policy(&self, record: PolicyRecord) -> FetchResult<ManagedPolicy> {
        let document = match &record.default_version_id {
            Some(version) => {
                let raw = with_retry(&self.options.retry, "get_policy_version", || {
                    self.api.get_policy_version_document(&record.arn, version)
                })
                .await?;
                let doc: Value = serde_json::from_str(&raw).map_err(|e| FetchError::InvalidData {
                    source_name: record.arn.clone(),
                    message: format!("policy document is not valid JSON: {}", e),
                })?;
                Some(doc)
            }
            None => None,
        };

        Ok(ManagedPolicy {
            name: record.name,
            arn: record.arn,
            document,
        })
    }

    /// TEAM data. Failures are logged and leave the affected part empty.
    async fn fetch_elevated_access(&self, instance_arn: &str) -> ElevatedAccess {
        let mut elevated = ElevatedAccess::default();

        match self.fetch_team_tables(&mut elevated).await {
            Ok(()) => info!("Fetched {} TEAM table(s)", elevated.tables.len()),
            Err(e) => warn!("Failed to fetch TEAM tables: {}", e),
        }

        match self.fetch_team_application(instance_arn).await {
            Ok(Some(app)) => {
                info!("Found {} at {}", TEAM_APPLICATION_NAME, app.arn);
                elevated.application = Some(app);
            }
            Ok(None) => info!("{} not found", TEAM_APPLICATION_NAME),
            Err(e) => warn!("Failed to fetch {}: {}", TEAM_APPLICATION_NAME, e),
        }

        elevated
    }

    async fn fetch_team_tables(&self, elevated: &mut ElevatedAccess) -> FetchResult<()> {
        let matcher = TeamTableMatcher::new()?;
        let names = self
            .collect_pages("list_tables", |t| self.api.list_tables(t))
            .await?;

        for name in names {
            let Some(kind) = matcher.classify(&name) else {
                continue;
            };

            let arn = with_retry(&self.options.retry, "describe_table", || {
                self.api.describe_table_arn(&name)
            })
            .await?;

            let tags = self
                .collect_pages("list_table_tags", |t| self.api.list_table_tags(&arn, t))
                .await?;
            if !has_team_tags(&tags) {
                debug!("Table {} does not carry the TEAM tags", name);
                continue;
            }

            let items = self
                .collect_pages("scan_table", |t| self.api.scan_table(&name, t))
                .await?;

            for item in &items {
                let decoded = match kind {
                    TeamTableKind::Eligibility => {
                        team::decode_eligibility(&name, item).map(|r| elevated.add_eligibility(r))
                    }
                    TeamTableKind::Approvers => {
                        team::decode_approver(&name, item).map(|r| elevated.add_approver(r))
                    }
                };
                if let Err(e) = decoded {
                    warn!("Skipping item in {}: {}", name, e);
                }
            }

            debug!("Read {} item(s) from {}", items.len(), name);
            elevated
                .tables
                .insert(name.clone(), TeamTable { name, arn });
        }

        Ok(())
    }

    async fn fetch_team_application(&self, instance_arn: &str) -> FetchResult<Option<TeamApplication>> {
        let applications = self
            .collect_pages("list_applications", |t| {
                self.api.list_applications(instance_arn, t)
            })
            .await?;

        let Some(app) = applications
            .into_iter()
            .find(|a| a.name == TEAM_APPLICATION_NAME)
        else {
            return Ok(None);
        };

        let assignments = self
            .collect_pages("list_application_assignments", |t| {
                self.api.list_application_assignments(&app.arn, t)
            })
            .await?;

        Ok(Some(TeamApplication {
            arn: app.arn,
            assignments: assignments.into_iter().collect(),
        }))
    }
}
