//! Service status derivation
//!
//! Pure functions over a declared service list and a live container snapshot.
//! Nothing here talks to the engine.

use std::collections::{BTreeMap, HashMap};

use crate::domain::container::LiveContainer;
use crate::domain::project::ServiceStatus;

/// Status of every declared service
///
/// running: at least one container of the service is running.
/// stopped: containers exist, none running.
/// not_created: no container carries the service label.
/// Containers of undeclared services are ignored.
pub fn derive_statuses<'a, I>(declared: I, live: &[LiveContainer]) -> BTreeMap<String, ServiceStatus>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut groups: HashMap<&str, Vec<&LiveContainer>> = HashMap::new();
    for container in live {
        if let Some(service) = container.service().filter(|s| !s.is_empty()) {
            groups.entry(service).or_default().push(container);
        }
    }

    declared
        .into_iter()
        .map(|service| {
            let group = groups.get(service).map(Vec::as_slice).unwrap_or_default();
            (service.to_string(), status_of(group))
        })
        .collect()
}

/// Status of one service from its correlated containers
pub fn status_of(group: &[&LiveContainer]) -> ServiceStatus {
    if group.iter().any(|c| c.state.is_running()) {
        ServiceStatus::Running
    } else if !group.is_empty() {
        ServiceStatus::Stopped
    } else {
        ServiceStatus::NotCreated
    }
}

/// `(running, stopped)` container counts; anything not running counts as stopped
pub fn count_containers(live: &[LiveContainer]) -> (usize, usize) {
    let running = live.iter().filter(|c| c.state.is_running()).count();
    (running, live.len() - running)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::container::{ContainerState, PROJECT_LABEL, SERVICE_LABEL};

    fn container(id: &str, service: &str, state: ContainerState) -> LiveContainer {
        LiveContainer {
            id: id.to_string(),
            name: format!("blog-{}-{}", service, id),
            image: "img".to_string(),
            state,
            status: String::new(),
            ports: vec![],
            labels: HashMap::from([
                (PROJECT_LABEL.to_string(), "blog".to_string()),
                (SERVICE_LABEL.to_string(), service.to_string()),
            ]),
        }
    }

    #[test]
    fn test_no_containers_means_not_created() {
        let declared = ["web", "db", "cache"];
        let statuses = derive_statuses(declared, &[]);

        assert_eq!(statuses.len(), 3);
        assert!(statuses.values().all(|s| *s == ServiceStatus::NotCreated));
    }

    #[test]
    fn test_running_beats_stopped() {
        // order of the snapshot must not matter
        let snapshots = [
            vec![
                container("1", "web", ContainerState::Running),
                container("2", "web", ContainerState::Exited),
            ],
            vec![
                container("2", "web", ContainerState::Exited),
                container("1", "web", ContainerState::Running),
            ],
        ];

        for live in snapshots {
            let statuses = derive_statuses(["web"], &live);
            assert_eq!(statuses["web"], ServiceStatus::Running);
        }
    }

    #[test]
    fn test_any_non_running_state_is_stopped() {
        for state in [
            ContainerState::Exited,
            ContainerState::Created,
            ContainerState::Paused,
            ContainerState::Restarting,
            ContainerState::Dead,
            ContainerState::Unknown("weird".to_string()),
        ] {
            let live = vec![container("1", "db", state)];
            assert_eq!(derive_statuses(["db"], &live)["db"], ServiceStatus::Stopped);
        }
    }

    #[test]
    fn test_undeclared_and_unlabeled_containers_ignored() {
        let mut unlabeled = container("9", "web", ContainerState::Running);
        unlabeled.labels.remove(SERVICE_LABEL);

        let live = vec![
            container("1", "ghost", ContainerState::Running),
            unlabeled,
        ];
        let statuses = derive_statuses(["web"], &live);

        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses["web"], ServiceStatus::NotCreated);
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let live = vec![
            container("1", "web", ContainerState::Running),
            container("2", "db", ContainerState::Exited),
        ];
        let first = derive_statuses(["web", "db", "cache"], &live);
        let second = derive_statuses(["web", "db", "cache"], &live);

        assert_eq!(first, second);
        assert_eq!(first["db"], ServiceStatus::Stopped);
        assert_eq!(first["cache"], ServiceStatus::NotCreated);
    }

    #[test]
    fn test_count_containers() {
        let live = vec![
            container("1", "web", ContainerState::Running),
            container("2", "web", ContainerState::Exited),
            container("3", "db", ContainerState::Paused),
        ];
        assert_eq!(count_containers(&live), (1, 2));
        assert_eq!(count_containers(&[]), (0, 0));
    }
}
