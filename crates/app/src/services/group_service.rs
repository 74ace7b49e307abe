//! Group service: the group table and fan-out of actions to members.
//!
//! A group action succeeds as long as the group exists. Each member is asked
//! live whether it supports the action; members that do not (including ids
//! of devices that were removed since the group was defined) are skipped
//! without being reported. A member whose backend call fails is logged and
//! skipped as well.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rfhub_domain::device::{Capability, DimLevel};
use rfhub_domain::error::{ConflictError, NotFoundError, RfHubError, ValidationError};
use rfhub_domain::group::Group;
use rfhub_domain::id::{DeviceId, GroupId};

use crate::ports::DeviceLibrary;

/// Action fanned out to the members of a group.
#[derive(Debug, Clone, Copy)]
enum GroupAction {
    TurnOn,
    TurnOff,
    Dim(DimLevel),
}

impl GroupAction {
    fn capability(self) -> Capability {
        match self {
            Self::TurnOn | Self::TurnOff => Capability::OnOff,
            Self::Dim(_) => Capability::Dim,
        }
    }
}

/// Application service owning the group table.
pub struct GroupService<L> {
    library: Arc<L>,
    groups: RwLock<BTreeMap<GroupId, Group>>,
}

impl<L: DeviceLibrary> GroupService<L> {
    /// Create an empty group table acting on `library`.
    pub fn new(library: Arc<L>) -> Self {
        Self {
            library,
            groups: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a new group.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the name could not be written back as
    /// a `GROUP` line, or [`RfHubError::Conflict`] when a group with the same
    /// id exists.
    #[tracing::instrument(skip(self, group), fields(group_id = %group.id))]
    pub fn add(&self, group: Group) -> Result<(), RfHubError> {
        group.check_name().map_err(ValidationError::from)?;
        let mut groups = self.write();
        if groups.contains_key(&group.id) {
            return Err(ConflictError {
                entity: "Group",
                id: group.id.to_string(),
            }
            .into());
        }
        groups.insert(group.id, group);
        Ok(())
    }

    /// Look up a group. Absence is not an error.
    pub fn get(&self, id: GroupId) -> Option<Group> {
        self.read().get(&id).cloned()
    }

    /// All groups, ordered by id.
    pub fn list(&self) -> Vec<Group> {
        self.read().values().cloned().collect()
    }

    /// Remove a group, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`RfHubError::NotFound`] when no such group exists.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: GroupId) -> Result<Group, RfHubError> {
        self.write().remove(&id).ok_or_else(|| group_not_found(id))
    }

    /// Turn on every member that supports on/off.
    ///
    /// Returns the members that were commanded.
    ///
    /// # Errors
    ///
    /// Returns [`RfHubError::NotFound`] only when the group does not exist.
    pub fn turn_on(&self, id: GroupId) -> Result<Vec<DeviceId>, RfHubError> {
        self.fan_out(id, GroupAction::TurnOn)
    }

    /// Turn off every member that supports on/off.
    ///
    /// # Errors
    ///
    /// Returns [`RfHubError::NotFound`] only when the group does not exist.
    pub fn turn_off(&self, id: GroupId) -> Result<Vec<DeviceId>, RfHubError> {
        self.fan_out(id, GroupAction::TurnOff)
    }

    /// Dim every member that supports dimming.
    ///
    /// # Errors
    ///
    /// Returns [`RfHubError::NotFound`] only when the group does not exist.
    pub fn dim(&self, id: GroupId, level: DimLevel) -> Result<Vec<DeviceId>, RfHubError> {
        self.fan_out(id, GroupAction::Dim(level))
    }

    /// Add groups from `GROUP` lines, one per line.
    ///
    /// Blank lines and lines starting with `#` are ignored. Every line is
    /// parsed before any group is added, so a malformed line adds nothing.
    /// Returns the number of groups added.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first malformed line, or a
    /// conflict error for a duplicate id.
    pub fn load_config(&self, text: &str) -> Result<usize, RfHubError> {
        let parsed = text
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                let trimmed = line.trim_start();
                !trimmed.is_empty() && !trimmed.starts_with('#')
            })
            .map(|(index, line)| {
                line.parse::<Group>()
                    .map_err(|source| ValidationError::InvalidGroupLine {
                        line: index + 1,
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = parsed.len();
        for group in parsed {
            self.add(group)?;
        }
        tracing::info!(count, "groups loaded");
        Ok(count)
    }

    /// Serialise every group as `GROUP` lines, ordered by id.
    pub fn to_config(&self) -> String {
        self.read()
            .values()
            .map(|group| format!("{group}\n"))
            .collect()
    }

    #[tracing::instrument(skip(self))]
    fn fan_out(&self, id: GroupId, action: GroupAction) -> Result<Vec<DeviceId>, RfHubError> {
        let members = self
            .read()
            .get(&id)
            .map(|group| group.devices.clone())
            .ok_or_else(|| group_not_found(id))?;

        let capability = action.capability();
        let mut acted = Vec::with_capacity(members.len());
        for member in members {
            if !self.library.supports(member, capability) {
                tracing::debug!(%member, %capability, "skipping member without capability");
                continue;
            }
            let result = match action {
                GroupAction::TurnOn => self.library.turn_on(member),
                GroupAction::TurnOff => self.library.turn_off(member),
                GroupAction::Dim(level) => self.library.dim(member, level),
            };
            match result {
                Ok(()) => acted.push(member),
                Err(err) => tracing::warn!(%member, error = %err, "group member action failed"),
            }
        }
        Ok(acted)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<GroupId, Group>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn group_not_found(id: GroupId) -> RfHubError {
    NotFoundError {
        entity: "Group",
        id: id.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeLibrary;
    use rfhub_domain::group::GroupParseError;

    fn make_service() -> (Arc<FakeLibrary>, GroupService<FakeLibrary>) {
        let library = Arc::new(FakeLibrary::default());
        (Arc::clone(&library), GroupService::new(Arc::clone(&library)))
    }

    fn group(id: i32, members: &[DeviceId]) -> Group {
        Group {
            id: GroupId::new(id),
            name: format!("group {id}"),
            devices: members.to_vec(),
        }
    }

    #[test]
    fn should_reject_duplicate_group_id() {
        let (_, service) = make_service();
        service.add(group(1, &[])).unwrap();
        let result = service.add(group(1, &[]));
        assert!(matches!(result, Err(RfHubError::Conflict(_))));
    }

    #[test]
    fn should_reject_group_name_with_quote() {
        let (_, service) = make_service();
        let mut quoted = group(1, &[]);
        quoted.name = "a\"b".to_string();

        let result = service.add(quoted);

        assert!(matches!(
            result,
            Err(RfHubError::Validation(ValidationError::InvalidGroup(
                GroupParseError::UnwritableName(_)
            )))
        ));
        assert!(service.list().is_empty());
        assert_eq!(service.to_config(), "");
    }

    #[test]
    fn should_distinguish_missing_group_from_empty_group() {
        let (_, service) = make_service();
        service.add(group(1, &[])).unwrap();
        assert!(service.get(GroupId::new(2)).is_none());
        assert_eq!(service.get(GroupId::new(1)).unwrap().devices, vec![]);
    }

    #[test]
    fn should_turn_on_capable_member_and_skip_incapable_one() {
        let (library, service) = make_service();
        let capable = library.add(true, false, false);
        let incapable = library.add(false, false, false);
        service.add(group(1, &[capable, incapable])).unwrap();

        let acted = service.turn_on(GroupId::new(1)).unwrap();

        assert_eq!(acted, vec![capable]);
        assert!(library.device(capable).unwrap().is_on);
        assert!(!library.device(incapable).unwrap().is_on);
    }

    #[test]
    fn should_skip_members_that_no_longer_exist() {
        let (library, service) = make_service();
        let present = library.add(true, true, false);
        service.add(group(1, &[DeviceId::new(99), present])).unwrap();

        let acted = service.dim(GroupId::new(1), DimLevel::new(40)).unwrap();

        assert_eq!(acted, vec![present]);
        assert_eq!(library.device(present).unwrap().level, DimLevel::new(40));
    }

    #[test]
    fn should_only_dim_members_that_support_dim() {
        let (library, service) = make_service();
        let switch = library.add(true, false, false);
        let dimmer = library.add(true, true, false);
        service.add(group(1, &[switch, dimmer])).unwrap();

        service.dim(GroupId::new(1), DimLevel::MAX).unwrap();

        assert_eq!(library.device(switch).unwrap().level, DimLevel::MIN);
        assert_eq!(library.device(dimmer).unwrap().level, DimLevel::MAX);
    }

    #[test]
    fn should_fail_action_when_group_missing() {
        let (_, service) = make_service();
        let result = service.turn_off(GroupId::new(5));
        assert!(matches!(result, Err(RfHubError::NotFound(_))));
    }

    #[test]
    fn should_succeed_when_group_has_no_members() {
        let (_, service) = make_service();
        service.add(group(1, &[])).unwrap();
        assert!(service.turn_off(GroupId::new(1)).unwrap().is_empty());
    }

    #[test]
    fn should_load_and_write_back_config() {
        let (_, service) = make_service();
        let text = "# living room\nGROUP 2 \"b\" 3 4\n\n   GROUP   1   \"a  b\"  7\n";

        let count = service.load_config(text).unwrap();

        assert_eq!(count, 2);
        assert_eq!(service.to_config(), "GROUP 1 \"a  b\" 7\nGROUP 2 \"b\" 3 4\n");
    }

    #[test]
    fn should_add_nothing_when_a_line_is_malformed() {
        let (_, service) = make_service();
        let result = service.load_config("GROUP 1 \"a\"\nGROUP x \"b\"\n");

        assert!(matches!(
            result,
            Err(RfHubError::Validation(ValidationError::InvalidGroupLine { line: 2, .. }))
        ));
        assert!(service.list().is_empty());
    }

    #[test]
    fn should_remove_group() {
        let (_, service) = make_service();
        service.add(group(3, &[])).unwrap();
        assert_eq!(service.remove(GroupId::new(3)).unwrap().id, GroupId::new(3));
        assert!(service.remove(GroupId::new(3)).is_err());
    }
}
