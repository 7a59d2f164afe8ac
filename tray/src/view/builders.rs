//! Status trees built from monitor snapshots

use crate::status::{ItemBuildStatus, ProjectSnapshot, ProjectState, QueueSetSnapshot, StatusItem};

fn queue_id(server_name: &str, queue_name: &str) -> String {
    format!("queue:{}/{}", server_name, queue_name)
}

/// Server node holding one node per queue and one per queued request.
/// Identifiers are derived from server, queue and project names.
pub fn queue_set_item(server_name: &str, queue_set: &QueueSetSnapshot) -> StatusItem {
    let queues = queue_set
        .queues
        .iter()
        .map(|queue| {
            let queue_id = queue_id(server_name, &queue.name);
            let requests = queue
                .requests
                .iter()
                .map(|request| {
                    let status = if request.activity.is_building() {
                        ItemBuildStatus::Running
                    } else {
                        ItemBuildStatus::Pending
                    };
                    StatusItem::new(
                        format!("{}/{}", queue_id, request.project_name),
                        request.project_name.clone(),
                        status,
                    )
                })
                .collect();

            let status = match queue.head() {
                Some(head) if head.activity.is_building() => ItemBuildStatus::Running,
                Some(_) => ItemBuildStatus::Pending,
                None => ItemBuildStatus::Unknown,
            };
            StatusItem::new(queue_id, format!("{} ({})", queue.name, queue.requests.len()), status)
                .with_children(requests)
        })
        .collect();

    StatusItem::new(format!("server:{}", server_name), server_name, ItemBuildStatus::Unknown)
        .with_children(queues)
}

pub fn state_item_status(state: ProjectState) -> ItemBuildStatus {
    match state {
        ProjectState::Success => ItemBuildStatus::CompletedSuccess,
        ProjectState::Broken => ItemBuildStatus::CompletedFailed,
        ProjectState::Building | ProjectState::BrokenAndBuilding => ItemBuildStatus::Running,
        ProjectState::NotConnected => ItemBuildStatus::Unknown,
    }
}

/// Flat list with one node per project snapshot
pub fn project_items(snapshots: &[ProjectSnapshot]) -> Vec<StatusItem> {
    snapshots
        .iter()
        .map(|snapshot| {
            let identifier = match snapshot.status.as_ref().map(|s| s.server_name.as_str()) {
                Some(server_name) if !server_name.is_empty() => {
                    format!("project:{}/{}", server_name, snapshot.project_name)
                }
                _ => format!("project:{}", snapshot.project_name),
            };
            let label = match snapshot.last_build_label() {
                "" => format!("{} [{}]", snapshot.project_name, snapshot.state),
                build_label => format!("{} [{}] {}", snapshot.project_name, snapshot.state, build_label),
            };
            StatusItem::new(
                identifier,
                label,
                state_item_status(snapshot.state),
            )
        })
        .collect()
}
