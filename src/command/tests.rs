#[cfg(test)]
mod tests {
    use crate::command::dispatcher::{Dispatcher, Outcome};
    use crate::routing::ring::DEFAULT_REPLICAS;
    use crate::routing::table::RouteTable;
    use crate::routing::types::{NodeId, PeerStatus};
    use crate::storage::memory::ShardedStore;
    use std::sync::Arc;

    const LOCAL: &str = "127.0.0.1:6000";
    const PEER: &str = "127.0.0.1:6001";

    fn node(addr: &str) -> NodeId {
        NodeId(addr.to_string())
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    fn single_node() -> (Dispatcher, Arc<RouteTable>) {
        let table = Arc::new(RouteTable::new(node(LOCAL), vec![], DEFAULT_REPLICAS));
        let store = Arc::new(ShardedStore::new(64));
        (Dispatcher::new(store, table.clone()), table)
    }

    fn two_nodes() -> (Dispatcher, Arc<RouteTable>) {
        let table = Arc::new(RouteTable::new(
            node(LOCAL),
            vec![node(PEER)],
            DEFAULT_REPLICAS,
        ));
        let store = Arc::new(ShardedStore::new(64));
        (Dispatcher::new(store, table.clone()), table)
    }

    /// A key the given table routes to `owner`.
    async fn key_owned_by(table: &RouteTable, owner: &NodeId) -> String {
        for i in 0..10_000 {
            let key = format!("probe_key_{}", i);
            if table.owner_of(&key).await == *owner {
                return key;
            }
        }
        panic!("no key found routing to {}", owner);
    }

    // ============================================================
    // BASIC VERBS
    // ============================================================

    #[tokio::test]
    async fn test_ping_pongs() {
        let (dispatcher, _) = single_node();
        assert_eq!(
            dispatcher.dispatch(&args(&["PING"])).await,
            Outcome::Finished("+PONG\r\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_verbs_are_case_insensitive() {
        let (dispatcher, _) = single_node();
        assert_eq!(
            dispatcher.dispatch(&args(&["ping"])).await,
            Outcome::Finished("+PONG\r\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_set_then_get_locally() {
        let (dispatcher, _) = single_node();

        assert_eq!(
            dispatcher.dispatch(&args(&["SET", "foo", "bar"])).await,
            Outcome::Finished("+OK\r\n".to_string())
        );
        assert_eq!(
            dispatcher.dispatch(&args(&["GET", "foo"])).await,
            Outcome::Finished("$3\r\nbar\r\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_get_miss() {
        let (dispatcher, _) = single_node();
        assert_eq!(
            dispatcher.dispatch(&args(&["GET", "qux"])).await,
            Outcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_unknown_verb_is_unsupported() {
        let (dispatcher, _) = single_node();
        assert_eq!(
            dispatcher.dispatch(&args(&["HELLO"])).await,
            Outcome::Unsupported
        );
        assert_eq!(
            dispatcher.dispatch(&args(&["COMMAND"])).await,
            Outcome::Unsupported
        );
    }

    #[tokio::test]
    async fn test_wrong_arity_is_unsupported() {
        let (dispatcher, _) = single_node();
        for bad in [
            vec!["SET", "foo"],
            vec!["SET", "foo", "bar", "extra"],
            vec!["GET"],
            vec!["GET", "foo", "extra"],
            vec!["PING", "message"],
            vec!["INFO", "section"],
            vec!["JOIN"],
            vec!["REMOVE"],
        ] {
            assert_eq!(
                dispatcher.dispatch(&args(&bad)).await,
                Outcome::Unsupported,
                "arity check failed for {:?}",
                bad
            );
        }
    }

    // ============================================================
    // OWNERSHIP & REDIRECTS
    // ============================================================

    #[tokio::test]
    async fn test_remote_key_redirects_to_owner() {
        let (dispatcher, table) = two_nodes();
        let key = key_owned_by(&table, &node(PEER)).await;

        assert_eq!(
            dispatcher.dispatch(&args(&["SET", &key, "v"])).await,
            Outcome::Redirect(node(PEER))
        );
        assert_eq!(
            dispatcher.dispatch(&args(&["GET", &key])).await,
            Outcome::Redirect(node(PEER))
        );
    }

    #[tokio::test]
    async fn test_local_key_is_served_despite_peers() {
        let (dispatcher, table) = two_nodes();
        let key = key_owned_by(&table, &node(LOCAL)).await;

        assert_eq!(
            dispatcher.dispatch(&args(&["SET", &key, "v"])).await,
            Outcome::Finished("+OK\r\n".to_string())
        );
    }

    // ============================================================
    // INFO
    // ============================================================

    #[tokio::test]
    async fn test_info_lists_every_peer_once() {
        let (dispatcher, table) = two_nodes();
        table.add_peer(node("127.0.0.1:6002")).await;
        table.mark(&node(PEER), PeerStatus::Up).await;

        let Outcome::Finished(reply) = dispatcher.dispatch(&args(&["INFO"])).await else {
            panic!("INFO should finish");
        };

        assert!(reply.starts_with("*3\r\n$15\r\nConnect status:\r\n"));
        let up = format!("${}\r\n{}: Up\r\n", PEER.len() + 4, PEER);
        let down = "$20\r\n127.0.0.1:6002: Down\r\n".to_string();
        assert!(reply.contains(&up), "missing Up line in {:?}", reply);
        assert!(reply.contains(&down), "missing Down line in {:?}", reply);
        assert_eq!(reply.matches(PEER).count(), 1);
    }

    #[tokio::test]
    async fn test_info_on_lone_node() {
        let (dispatcher, _) = single_node();
        assert_eq!(
            dispatcher.dispatch(&args(&["INFO"])).await,
            Outcome::Finished("*1\r\n$15\r\nConnect status:\r\n".to_string())
        );
    }

    // ============================================================
    // JOIN
    // ============================================================

    #[tokio::test]
    async fn test_join_reply_and_membership() {
        let (dispatcher, table) = single_node();

        let Outcome::Finished(reply) =
            dispatcher.dispatch(&args(&["JOIN", "127.0.0.1:6005"])).await
        else {
            panic!("JOIN should finish");
        };

        // No pre-existing peers: just the OK element.
        assert_eq!(reply, "*1\r\n$2\r\nOK\r\n");

        let snapshot = table.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, node("127.0.0.1:6005"));
        assert_eq!(snapshot[0].1, PeerStatus::Down);
    }

    #[tokio::test]
    async fn test_join_reply_enumerates_existing_peers() {
        let (dispatcher, _) = two_nodes();

        let Outcome::Finished(reply) =
            dispatcher.dispatch(&args(&["JOIN", "127.0.0.1:6005"])).await
        else {
            panic!("JOIN should finish");
        };

        // The pre-existing peer set excludes the joiner itself.
        assert!(reply.starts_with("*2\r\n$2\r\nOK\r\n"));
        assert!(reply.contains(&format!("${}\r\n{}\r\n", PEER.len(), PEER)));
        assert!(!reply.contains("127.0.0.1:6005"));
    }

    #[tokio::test]
    async fn test_join_twice_is_idempotent() {
        let (dispatcher, table) = single_node();

        dispatcher.dispatch(&args(&["JOIN", "127.0.0.1:6005"])).await;
        let after_first = {
            let mut peers = table.peer_ids().await;
            peers.sort();
            peers
        };

        dispatcher.dispatch(&args(&["JOIN", "127.0.0.1:6005"])).await;
        let after_second = {
            let mut peers = table.peer_ids().await;
            peers.sort();
            peers
        };

        assert_eq!(after_first, after_second);
    }

    #[tokio::test]
    async fn test_join_self_is_not_added() {
        let (dispatcher, table) = single_node();
        dispatcher.dispatch(&args(&["JOIN", LOCAL])).await;
        assert!(table.peer_ids().await.is_empty());
    }

    // ============================================================
    // REMOVE
    // ============================================================

    #[tokio::test]
    async fn test_remove_peer() {
        let (dispatcher, table) = two_nodes();

        assert_eq!(
            dispatcher.dispatch(&args(&["REMOVE", PEER])).await,
            Outcome::Finished("+OK\r\n".to_string())
        );
        assert!(table.peer_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_remove_unknown_peer_still_replies_ok() {
        let (dispatcher, table) = two_nodes();

        assert_eq!(
            dispatcher.dispatch(&args(&["REMOVE", "127.0.0.1:9999"])).await,
            Outcome::Finished("+OK\r\n".to_string())
        );
        assert_eq!(table.peer_ids().await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_self_clears_membership() {
        let (dispatcher, table) = two_nodes();
        table.add_peer(node("127.0.0.1:6002")).await;

        assert_eq!(
            dispatcher.dispatch(&args(&["REMOVE", LOCAL])).await,
            Outcome::Finished("+OK\r\n".to_string())
        );

        assert!(table.peer_ids().await.is_empty());
        // Every key now routes to the local node.
        for i in 0..50 {
            assert_eq!(table.owner_of(&format!("key_{}", i)).await, node(LOCAL));
        }
    }
}
