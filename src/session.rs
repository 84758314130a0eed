//! The session owns both caches and the view for the lifetime of the
//! program and applies user events to them.
//!
//! Events are applied one at a time, in arrival order: an event that is
//! waiting on the backend holds up the ones behind it, so a later event
//! always sees the effects of earlier ones.  Cache locks are still released
//! before a backend call suspends, so readers are never blocked by a fetch.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future;
use log::{debug, info, warn};
use tokio::sync::{Mutex, RwLock};

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::events::UiEvent;
use crate::hierarchy::{ExpandOutcome, HierarchyCache};
use crate::hosts::HostCache;
use crate::render::{self, children_container, TABLE_CONTAINER};
use crate::types::{HostId, LabelId, NewHost};
use crate::view::{View, ViewKind, LOADING_CONTAINER};

pub struct Session<V> {
    hosts: HostCache,
    tree: HierarchyCache,
    view: V,
    /// Tree nodes currently open in the view.  The root is always open.
    open: RwLock<HashSet<LabelId>>,
    initial_view: ViewKind,
    /// Held for the whole of one event.  Waiters are served in FIFO order.
    turn: Mutex<()>,
}

impl<V: View> Session<V> {
    pub fn new(backend: Arc<dyn Backend>, view: V, initial_view: ViewKind) -> Self {
        Self {
            hosts: HostCache::new(Arc::clone(&backend)),
            tree: HierarchyCache::new(backend),
            view,
            open: RwLock::new(HashSet::from([LabelId::ROOT])),
            initial_view,
            turn: Mutex::new(()),
        }
    }

    /// Load the host list and the top level of the tree, render both and
    /// reveal the initial view.
    pub async fn bootstrap(&self) -> Result<()> {
        let (hosts, root) = future::join(self.hosts.refresh(), self.tree.expand(LabelId::ROOT)).await;
        let added = hosts?;
        let top_level = match root? {
            ExpandOutcome::Expanded { children } => children,
            ExpandOutcome::AlreadyExpanded | ExpandOutcome::InFlight => 0,
        };
        info!(
            "Bootstrap loaded {} hosts and {} top-level labels",
            added, top_level
        );
        if added == 0 {
            warn!("No hosts are monitored yet");
        }

        self.render_table().await?;
        self.render_children(LabelId::ROOT).await?;
        self.switch_view(self.initial_view).await?;
        self.view.set_hidden(LOADING_CONTAINER, true).await
    }

    pub async fn handle(&self, event: UiEvent) -> Result<()> {
        let _turn = self.turn.lock().await;
        debug!("Handling {:?}", event);
        match event {
            UiEvent::CreateHost { hostname, ttl } => self.create_host(&hostname, ttl).await,
            UiEvent::DeleteHost(id) => self.delete_host(id).await,
            UiEvent::Open(id) => self.open(id).await,
            UiEvent::Close(id) => self.close(id).await,
            UiEvent::Refresh => self.refresh().await,
            UiEvent::SwitchView(kind) => self.switch_view(kind).await,
        }
    }

    async fn create_host(&self, hostname: &str, ttl: u32) -> Result<()> {
        let new_host = NewHost::new(hostname, ttl)?;
        let host = self.hosts.create(&new_host).await?;
        info!("Created host {} ({})", host.hostname, host.id);
        self.render_table().await
    }

    async fn delete_host(&self, id: HostId) -> Result<()> {
        self.hosts.remove(id).await?;
        info!("Deleted host {}", id);
        self.render_table().await?;
        // Status panels of the deleted host disappear from every open branch.
        let open: Vec<LabelId> = self.open.read().await.iter().copied().collect();
        for node in open {
            self.render_children(node).await?;
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<()> {
        let added = self.hosts.refresh().await?;
        info!("Refresh added {} hosts", added);
        self.render_table().await
    }

    /// Open a node: the first open fetches its children, later opens render
    /// from the cache.  Opening a node that is already open does nothing.
    async fn open(&self, id: LabelId) -> Result<()> {
        if id.is_root() {
            return Ok(());
        }
        let parent = self.parent_of(id).await?;
        if !self.open.write().await.insert(id) {
            debug!("Label {} is already open", id);
            return Ok(());
        }

        if let Err(e) = self.tree.expand(id).await {
            self.open.write().await.remove(&id);
            return Err(e);
        }
        self.render_children(id).await?;
        self.render_children(parent).await
    }

    /// Collapsing is view state only; cached children are kept.  The parent
    /// container is re-rendered so the entry no longer shows as open.
    async fn close(&self, id: LabelId) -> Result<()> {
        if id.is_root() {
            return Ok(());
        }
        let parent = self.parent_of(id).await?;
        if self.open.write().await.remove(&id) {
            self.render_children(parent).await?;
        }
        Ok(())
    }

    async fn parent_of(&self, id: LabelId) -> Result<LabelId> {
        self.tree
            .lookup_by_identity(id)
            .await
            .map(|node| node.parent)
            .ok_or(Error::UnknownLabel(id))
    }

    async fn switch_view(&self, kind: ViewKind) -> Result<()> {
        for candidate in ViewKind::ALL {
            self.view
                .set_hidden(candidate.container(), candidate != kind)
                .await?;
        }
        Ok(())
    }

    async fn render_table(&self) -> Result<()> {
        let markup = render::host_table(self.hosts.read().await.hosts());
        self.view.replace(TABLE_CONTAINER, &markup).await
    }

    /// Fill a node's placeholder from its cached children.  Nothing is
    /// written while the children are still being fetched.
    async fn render_children(&self, id: LabelId) -> Result<()> {
        let markup = {
            let tree = self.tree.read().await;
            if !tree.node(id).is_some_and(|node| node.is_expanded()) {
                return Ok(());
            }
            let hosts = self.hosts.read().await;
            let open = self.open.read().await;
            render::label_entries(&tree, id, &*hosts, &open)
        };
        self.view.replace(&children_container(id), &markup).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{host, label, MockBackend};
    use crate::view::recording::RecordingView;

    fn session(backend: &Arc<MockBackend>) -> Session<RecordingView> {
        Session::new(backend.clone(), RecordingView::default(), ViewKind::Table)
    }

    fn example_backend() -> MockBackend {
        MockBackend::default()
            .with_hosts(vec![host(2, "b.example.com"), host(1, "a.example.com")])
            .with_children(0, vec![label(10, "org", None), label(11, "com", None)])
            .with_children(
                11,
                vec![label(13, "b.example.com", Some(2)), label(12, "a.example.com", Some(1))],
            )
    }

    #[tokio::test]
    async fn bootstrap_renders_everything() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        let view = &session.view;
        let table = view.contents(TABLE_CONTAINER).unwrap();
        assert_eq!(table.matches("<tr").count(), 2);
        assert!(table.find("a.example.com").unwrap() < table.find("b.example.com").unwrap());

        let list = view.contents("data_list").unwrap();
        assert!(list.find(">com<").unwrap() < list.find(">org<").unwrap());

        assert_eq!(view.is_hidden("view_table"), Some(false));
        assert_eq!(view.is_hidden("view_tree"), Some(true));
        assert_eq!(view.is_hidden(LOADING_CONTAINER), Some(true));
    }

    #[tokio::test]
    async fn bootstrap_failure_keeps_loading_view() {
        let backend = Arc::new(example_backend());
        backend.set_failing(true);
        let session = session(&backend);

        assert!(session.bootstrap().await.is_err());
        assert_eq!(session.view.is_hidden(LOADING_CONTAINER), None);
        assert_eq!(session.hosts.read().await.len(), 0);
        assert!(!session.tree.read().await.node(LabelId::ROOT).unwrap().is_expanded());
    }

    #[tokio::test]
    async fn create_then_render_single_row() {
        let backend = Arc::new(MockBackend::default().with_next_host_id(7));
        let session = session(&backend);

        session
            .handle(UiEvent::CreateHost {
                hostname: "a.example.com".into(),
                ttl: 300,
            })
            .await
            .unwrap();

        let table = session.view.contents(TABLE_CONTAINER).unwrap();
        assert_eq!(table.matches("<tr").count(), 1);
        assert!(table.contains("<td>a.example.com</td><td>300</td><td></td><td></td>"));
        assert!(table.contains("data-host-id=\"7\""));
    }

    #[tokio::test]
    async fn invalid_host_never_reaches_backend() {
        let backend = Arc::new(MockBackend::default());
        let session = session(&backend);

        let result = session
            .handle(UiEvent::CreateHost {
                hostname: "bad_host".into(),
                ttl: 300,
            })
            .await;
        assert!(matches!(result, Err(Error::InvalidHost(_))));
        assert_eq!(backend.create_calls(), 0);
        assert!(session.view.contents(TABLE_CONTAINER).is_none());
    }

    #[tokio::test]
    async fn delete_removes_only_that_row() {
        let backend = Arc::new(
            MockBackend::default().with_hosts(vec![
                host(9, "c.example.com"),
                host(7, "b.example.com"),
                host(8, "a.example.com"),
            ]),
        );
        let session = session(&backend);
        session.bootstrap().await.unwrap();
        let before = session.view.contents(TABLE_CONTAINER).unwrap();

        session.handle(UiEvent::DeleteHost(HostId(7))).await.unwrap();

        let after = session.view.contents(TABLE_CONTAINER).unwrap();
        let expected: String = before
            .lines()
            .filter(|row| !row.contains("data-host-id=\"7\""))
            .map(|row| format!("{row}\n"))
            .collect();
        assert_eq!(after, expected);
        assert!(session.hosts.read().await.get(HostId(7)).is_none());
    }

    #[tokio::test]
    async fn failed_delete_keeps_row() {
        let backend = Arc::new(MockBackend::default().with_hosts(vec![host(7, "a.example.com")]));
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        backend.set_failing(true);
        assert!(session.handle(UiEvent::DeleteHost(HostId(7))).await.is_err());
        let table = session.view.contents(TABLE_CONTAINER).unwrap();
        assert!(table.contains("a.example.com"));
    }

    #[tokio::test]
    async fn reopening_a_node_costs_no_fetch() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        session.handle(UiEvent::Open(LabelId(11))).await.unwrap();
        let first = session.view.contents("label_11_children").unwrap();
        assert!(first.find("a.example.com").unwrap() < first.find("b.example.com").unwrap());
        assert_eq!(first.matches("host-status").count(), 2);

        session.handle(UiEvent::Close(LabelId(11))).await.unwrap();
        session.handle(UiEvent::Open(LabelId(11))).await.unwrap();
        let second = session.view.contents("label_11_children").unwrap();

        assert_eq!(backend.children_calls(11), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn double_open_is_ignored() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        let (a, b) = tokio::join!(
            session.handle(UiEvent::Open(LabelId(11))),
            session.handle(UiEvent::Open(LabelId(11)))
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(backend.children_calls(11), 1);
        let writes = session.view.writes();
        assert_eq!(
            writes.iter().filter(|c| *c == "label_11_children").count(),
            1
        );
    }

    #[tokio::test]
    async fn failed_open_can_be_retried() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        backend.set_failing(true);
        assert!(session.handle(UiEvent::Open(LabelId(11))).await.is_err());
        assert!(session.view.contents("label_11_children").is_none());

        backend.set_failing(false);
        session.handle(UiEvent::Open(LabelId(11))).await.unwrap();
        assert_eq!(backend.children_calls(11), 2);
        assert!(session.view.contents("label_11_children").is_some());
    }

    #[tokio::test]
    async fn open_unknown_label_fails() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        assert!(matches!(
            session.handle(UiEvent::Open(LabelId(99))).await,
            Err(Error::UnknownLabel(LabelId(99)))
        ));
    }

    #[tokio::test]
    async fn deleting_a_host_drops_its_status_panel() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();
        session.handle(UiEvent::Open(LabelId(11))).await.unwrap();

        session.handle(UiEvent::DeleteHost(HostId(1))).await.unwrap();

        let list = session.view.contents("data_list").unwrap();
        assert!(list.contains("<details data-label-id=\"11\" open>"));
        assert_eq!(list.matches("host-status").count(), 1);

        let branch = session.view.contents("label_11_children").unwrap();
        assert_eq!(branch.matches("host-status").count(), 1);
        assert!(branch.contains("a.example.com"));
    }

    #[tokio::test]
    async fn child_opened_right_after_parent_waits_for_it() {
        let backend = Arc::new(
            example_backend().with_children(12, vec![label(14, "www.a.example.com", None)]),
        );
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        let (parent, child) = tokio::join!(
            session.handle(UiEvent::Open(LabelId(11))),
            session.handle(UiEvent::Open(LabelId(12)))
        );
        parent.unwrap();
        child.unwrap();

        assert_eq!(backend.children_calls(11), 1);
        assert_eq!(backend.children_calls(12), 1);
        let branch = session.view.contents("label_12_children").unwrap();
        assert!(branch.contains("www.a.example.com"));
    }

    #[tokio::test]
    async fn close_rerenders_parent_without_open_marker() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        session.handle(UiEvent::Open(LabelId(11))).await.unwrap();
        let list = session.view.contents("data_list").unwrap();
        assert!(list.contains("<details data-label-id=\"11\" open>"));

        session.handle(UiEvent::Close(LabelId(11))).await.unwrap();
        let list = session.view.contents("data_list").unwrap();
        assert!(list.contains("<details data-label-id=\"11\">"));
        assert!(!list.contains(" open>"));
        assert_eq!(backend.children_calls(11), 1);
    }

    #[tokio::test]
    async fn close_unknown_label_fails() {
        let backend = Arc::new(example_backend());
        let session = session(&backend);
        session.bootstrap().await.unwrap();

        assert!(matches!(
            session.handle(UiEvent::Close(LabelId(99))).await,
            Err(Error::UnknownLabel(LabelId(99)))
        ));
    }

    #[tokio::test]
    async fn refresh_and_switch_view() {
        let backend = Arc::new(MockBackend::default());
        let session = session(&backend);
        session.bootstrap().await.unwrap();
        assert_eq!(session.view.contents(TABLE_CONTAINER).unwrap(), "");

        backend.create_host(&NewHost::new("x.example.com", 60).unwrap()).await.unwrap();

        session.handle(UiEvent::Refresh).await.unwrap();
        assert!(session
            .view
            .contents(TABLE_CONTAINER)
            .unwrap()
            .contains("x.example.com"));

        session.handle(UiEvent::SwitchView(ViewKind::Tree)).await.unwrap();
        assert_eq!(session.view.is_hidden("view_table"), Some(true));
        assert_eq!(session.view.is_hidden("view_tree"), Some(false));
    }
}
