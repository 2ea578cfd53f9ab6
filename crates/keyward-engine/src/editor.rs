//! Claim editors: apply resolved parameters onto an in-memory claim.
//!
//! Each editor is typed by the claim body it accepts, so a command can only
//! be wired to the matching kind. The body's own `type` field is still
//! checked, since a decoded or hand-built body may disagree with it.

use keyward_core::claims::{ClaimBody, Claims, OperatorBody, UserBody};
use keyward_core::permissions::PermissionLists;

use crate::error::{ActionError, ActionResult};
use crate::time_window::TimeWindow;

pub trait ClaimEditor<B: ClaimBody> {
    /// Mutate `claims`. Applying the same edits twice gives the same claim.
    fn apply(&self, claims: &mut Claims<B>) -> ActionResult<()>;
}

fn check_kind<B: ClaimBody>(claims: &Claims<B>) -> ActionResult<()> {
    let declared = claims.keyward.declared_kind();
    if declared != B::KIND {
        return Err(ActionError::ClaimTypeMismatch {
            expected: B::KIND,
            found: declared.to_string(),
        });
    }
    Ok(())
}

/// Edits shared by every kind: validity bounds and tags.
#[derive(Debug, Clone, Default)]
pub struct EntityEdits {
    pub window: TimeWindow,
    pub tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl EntityEdits {
    fn apply_tags<B: ClaimBody>(&self, claims: &mut Claims<B>) {
        let tags = claims.keyward.tags_mut();
        tags.remove(&self.remove_tags);
        tags.add(&self.tags);
        tags.sort();
    }
}

impl<B: ClaimBody> ClaimEditor<B> for EntityEdits {
    fn apply(&self, claims: &mut Claims<B>) -> ActionResult<()> {
        check_kind(claims)?;
        self.window.apply(claims);
        self.apply_tags(claims);
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct OperatorEdits {
    pub common: EntityEdits,
    pub account_server_url: Option<String>,
}

impl ClaimEditor<OperatorBody> for OperatorEdits {
    fn apply(&self, claims: &mut Claims<OperatorBody>) -> ActionResult<()> {
        self.common.apply(claims)?;
        if let Some(url) = &self.account_server_url {
            claims.keyward.account_server_url = Some(url.clone()).filter(|u| !u.is_empty());
        }
        Ok(())
    }
}

/// Bounds, then permissions, then tags and source networks.
#[derive(Debug, Clone, Default)]
pub struct UserEdits {
    pub common: EntityEdits,
    pub permissions: PermissionLists,
    /// Patterns dropped from every allow and deny list before merging.
    pub remove_permissions: Vec<String>,
    pub src: Vec<String>,
}

impl ClaimEditor<UserBody> for UserEdits {
    fn apply(&self, claims: &mut Claims<UserBody>) -> ActionResult<()> {
        check_kind(claims)?;
        self.common.window.apply(claims);

        let perms = &mut claims.keyward.permissions;
        perms.publish.remove(&self.remove_permissions);
        perms.subscribe.remove(&self.remove_permissions);
        self.permissions.apply(perms);

        self.common.apply_tags(claims);
        claims.keyward.src.add(&self.src);
        claims.keyward.src.sort();
        Ok(())
    }
}
