// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Desired-state compilation tests.

mod common;

use common::{CLUSTER, TestContext};
use hosting_core::CoreError;
use hosting_core::lifecycle::{
    CreateDaemon, CreateDatabase, CreateDatabaseUser, CreateNode, CreateS3Bucket, CreateShard,
    CreateSshKey, CreateValkeyInstance, CreateValkeyUser,
};
use hosting_core::model::{ResourceKind, ResourceStatus, RoleState, ShardRole};
use hosting_core::store::ResourceStore;

#[tokio::test]
async fn test_unknown_node_is_not_found() {
    let ctx = TestContext::new().await;

    let err = ctx
        .services
        .desired_state
        .get_for_node("missing")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_node_without_shard_is_not_found() {
    let ctx = TestContext::new().await;
    let node = ctx
        .services
        .infra
        .create_node(CreateNode {
            cluster_id: common::CLUSTER.into(),
            hostname: "spare-1".into(),
            shard_id: None,
        })
        .await
        .unwrap();

    let err = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_role_without_loader_is_validation_error() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("dns-1", ShardRole::Dns).await;
    let node = ctx.node(&shard, "ns1").await;

    let err = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }), "{:?}", err);
}

#[tokio::test]
async fn test_web_state_only_lists_visible_tenants() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let node = ctx.node(&shard, "web-1a").await;

    let active = ctx.active_tenant("active", &shard).await;
    let suspended = ctx.active_tenant("suspended", &shard).await;
    ctx.services.tenants.suspend(&suspended.id).await.unwrap();
    let _pending = ctx.tenant("pending", Some(&shard)).await;
    let failed = ctx.tenant("failed", Some(&shard)).await;
    ctx.fail(ResourceKind::Tenant, &failed.id, "boom").await;
    let deleting = ctx.active_tenant("deleting", &shard).await;
    ctx.services.tenants.delete(&deleting.id).await.unwrap();

    let state = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap();
    assert_eq!(state.node_id, node.id);
    assert_eq!(state.shard_id, shard.id);
    assert_eq!(state.shard_role(), ShardRole::Web);

    let RoleState::Web { tenants } = state.role else {
        panic!("expected web state");
    };
    let names: Vec<_> = tenants.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["active", "suspended"]);
    assert_eq!(tenants[0].id, active.id);
    assert_eq!(tenants[1].status, ResourceStatus::Suspended);
}

#[tokio::test]
async fn test_web_state_nests_webroot_resources() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let node = ctx.node(&shard, "web-1a").await;
    let tenant = ctx.active_tenant("acme", &shard).await;
    let webroot = ctx.active_webroot(&tenant, "main").await;
    let _hidden_webroot = ctx.webroot(&tenant, "staging").await;

    let fqdn = ctx.fqdn(&webroot, "acme.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &fqdn.id).await;
    let _pending_fqdn = ctx.fqdn(&webroot, "www.acme.example.com").await;

    let active_job = ctx.active_cron_job(&webroot, "active-job", 0).await;
    let disabled_job = ctx.active_cron_job(&webroot, "disabled-job", 1).await;
    ctx.services
        .cron_monitor
        .report_cron_outcome(&disabled_job.id, false)
        .await
        .unwrap();
    let _pending_job = ctx.cron_job(&webroot, "pending-job", 0).await;
    let failed_job = ctx.cron_job(&webroot, "failed-job", 0).await;
    ctx.fail(ResourceKind::CronJob, &failed_job.id, "bad command").await;

    let daemon = ctx
        .services
        .daemons
        .create(CreateDaemon {
            webroot_id: webroot.id.clone(),
            name: "ws".into(),
            command: "node ws.js".into(),
            proxy_path: Some("/ws".into()),
            proxy_port: None,
            num_procs: 2,
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::Daemon, &daemon.id).await;

    let key = ctx
        .services
        .ssh_keys
        .create(CreateSshKey {
            tenant_id: tenant.id.clone(),
            name: "laptop".into(),
            public_key: "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5 dev@laptop".into(),
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::SshKey, &key.id).await;

    let state = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap();
    let RoleState::Web { tenants } = state.role else {
        panic!("expected web state");
    };
    assert_eq!(tenants.len(), 1);
    let tenant_state = &tenants[0];
    assert_eq!(tenant_state.uid, tenant.uid);
    assert_eq!(tenant_state.ssh_keys.len(), 1);
    assert_eq!(tenant_state.ssh_keys[0].name, "laptop");

    assert_eq!(tenant_state.webroots.len(), 1);
    let webroot_state = &tenant_state.webroots[0];
    assert_eq!(webroot_state.name, "main");
    assert_eq!(webroot_state.runtime_config["memory_limit"], "256M");
    assert_eq!(
        webroot_state.env_vars.get("APP_ENV").map(String::as_str),
        Some("production")
    );

    let fqdns: Vec<_> = webroot_state.fqdns.iter().map(|f| f.fqdn.as_str()).collect();
    assert_eq!(fqdns, vec!["acme.example.com"]);

    let jobs: Vec<_> = webroot_state
        .cron_jobs
        .iter()
        .map(|j| (j.name.as_str(), j.status))
        .collect();
    assert_eq!(
        jobs,
        vec![
            ("active-job", ResourceStatus::Active),
            ("disabled-job", ResourceStatus::AutoDisabled),
        ]
    );
    assert_eq!(webroot_state.cron_jobs[0].id, active_job.id);
    assert!(!webroot_state.cron_jobs[1].enabled);

    assert_eq!(webroot_state.daemons.len(), 1);
    let daemon_state = &webroot_state.daemons[0];
    assert_eq!(daemon_state.node_id.as_deref(), Some(node.id.as_str()));
    assert_eq!(daemon_state.proxy_path.as_deref(), Some("/ws"));
    assert_eq!(daemon_state.proxy_port, daemon.proxy_port);
    assert_eq!(daemon_state.num_procs, 2);
}

#[tokio::test]
async fn test_lb_state_routes_cluster_fqdns() {
    let ctx = TestContext::new().await;
    let lb = ctx.shard("lb-1", ShardRole::Lb).await;
    let lb_node = ctx.node(&lb, "lb-1a").await;
    let web = ctx.shard("web-1", ShardRole::Web).await;
    let other_cluster_web = ctx.shard_in("cluster-2", "web-9", ShardRole::Web).await;

    let live = ctx.active_tenant("live", &web).await;
    let live_root = ctx.active_webroot(&live, "main").await;
    let live_fqdn = ctx.fqdn(&live_root, "live.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &live_fqdn.id).await;

    let paused = ctx.active_tenant("paused", &web).await;
    let paused_root = ctx.active_webroot(&paused, "main").await;
    let paused_fqdn = ctx.fqdn(&paused_root, "paused.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &paused_fqdn.id).await;
    ctx.services.tenants.suspend(&paused.id).await.unwrap();

    let leaving = ctx.active_tenant("leaving", &web).await;
    let leaving_root = ctx.active_webroot(&leaving, "main").await;
    let leaving_fqdn = ctx.fqdn(&leaving_root, "leaving.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &leaving_fqdn.id).await;
    ctx.services.tenants.delete(&leaving.id).await.unwrap();

    let elsewhere = ctx.active_tenant("elsewhere", &other_cluster_web).await;
    let elsewhere_root = ctx.active_webroot(&elsewhere, "main").await;
    let elsewhere_fqdn = ctx.fqdn(&elsewhere_root, "elsewhere.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &elsewhere_fqdn.id).await;

    let _pending = ctx.fqdn(&live_root, "pending.example.com").await;

    let state = ctx
        .services
        .desired_state
        .get_for_node(&lb_node.id)
        .await
        .unwrap();
    let RoleState::Lb { fqdn_mappings } = state.role else {
        panic!("expected lb state");
    };
    let routed: Vec<_> = fqdn_mappings
        .iter()
        .map(|m| (m.fqdn.as_str(), m.lb_backend.as_deref()))
        .collect();
    assert_eq!(
        routed,
        vec![
            ("live.example.com", Some("web-1.backend:80")),
            ("paused.example.com", Some("web-1.backend:80")),
        ]
    );
}

#[tokio::test]
async fn test_lb_state_keeps_fqdns_of_shards_without_backend() {
    let ctx = TestContext::new().await;
    let lb = ctx.shard("lb-1", ShardRole::Lb).await;
    let lb_node = ctx.node(&lb, "lb-1a").await;
    let web = ctx
        .services
        .infra
        .create_shard(CreateShard {
            cluster_id: CLUSTER.to_string(),
            name: "web-bare".to_string(),
            role: ShardRole::Web,
            lb_backend: None,
        })
        .await
        .unwrap();

    let tenant = ctx.active_tenant("acme", &web).await;
    let webroot = ctx.active_webroot(&tenant, "main").await;
    let fqdn = ctx.fqdn(&webroot, "acme.example.com").await;
    ctx.activate(ResourceKind::Fqdn, &fqdn.id).await;

    let state = ctx
        .services
        .desired_state
        .get_for_node(&lb_node.id)
        .await
        .unwrap();
    let RoleState::Lb { fqdn_mappings } = state.role else {
        panic!("expected lb state");
    };
    assert_eq!(fqdn_mappings.len(), 1);
    assert_eq!(fqdn_mappings[0].fqdn, "acme.example.com");
    assert_eq!(fqdn_mappings[0].lb_backend, None);
}

#[tokio::test]
async fn test_database_state_lists_active_databases_with_users() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("db-1", ShardRole::Database).await;
    let node = ctx.node(&shard, "db-1a").await;

    let database = ctx
        .services
        .databases
        .create(CreateDatabase {
            tenant_id: None,
            shard_id: shard.id.clone(),
            name: "shop".into(),
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::Database, &database.id).await;
    let _pending = ctx
        .services
        .databases
        .create(CreateDatabase {
            tenant_id: None,
            shard_id: shard.id.clone(),
            name: "later".into(),
        })
        .await
        .unwrap();

    let user = ctx
        .services
        .databases
        .create_user(CreateDatabaseUser {
            database_id: database.id.clone(),
            username: "shop_rw".into(),
            password: Some("s3cret".into()),
            privileges: vec!["SELECT".into(), "INSERT".into()],
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::DatabaseUser, &user.id).await;

    let state = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap();
    let RoleState::Database { databases } = state.role else {
        panic!("expected database state");
    };
    assert_eq!(databases.len(), 1);
    assert_eq!(databases[0].name, "shop");
    assert_eq!(databases[0].users.len(), 1);
    assert_eq!(databases[0].users[0].password, "s3cret");
    assert_eq!(databases[0].users[0].privileges.0, vec!["SELECT", "INSERT"]);
}

#[tokio::test]
async fn test_valkey_and_storage_state() {
    let ctx = TestContext::new().await;
    let valkey = ctx.shard("valkey-1", ShardRole::Valkey).await;
    let valkey_node = ctx.node(&valkey, "valkey-1a").await;
    let storage = ctx.shard("s3-1", ShardRole::Storage).await;
    let storage_node = ctx.node(&storage, "s3-1a").await;

    let instance = ctx
        .services
        .valkey
        .create(CreateValkeyInstance {
            tenant_id: None,
            shard_id: valkey.id.clone(),
            name: "sessions".into(),
            max_memory_mb: Some(128),
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::ValkeyInstance, &instance.id).await;
    let user = ctx
        .services
        .valkey
        .create_user(CreateValkeyUser {
            valkey_instance_id: instance.id.clone(),
            username: "app".into(),
            password: None,
            privileges: vec!["+@read".into()],
            key_pattern: "~app:*".into(),
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::ValkeyUser, &user.id).await;

    let bucket = ctx
        .services
        .s3_buckets
        .create(CreateS3Bucket {
            tenant_id: None,
            shard_id: storage.id.clone(),
            name: "assets".into(),
            public: true,
            quota_bytes: 1 << 30,
        })
        .await
        .unwrap();
    ctx.activate(ResourceKind::S3Bucket, &bucket.id).await;

    let state = ctx
        .services
        .desired_state
        .get_for_node(&valkey_node.id)
        .await
        .unwrap();
    let RoleState::Valkey { valkey_instances } = state.role else {
        panic!("expected valkey state");
    };
    assert_eq!(valkey_instances.len(), 1);
    assert_eq!(valkey_instances[0].port, 6380);
    assert_eq!(valkey_instances[0].max_memory_mb, 128);
    assert_eq!(valkey_instances[0].users[0].key_pattern, "~app:*");

    let state = ctx
        .services
        .desired_state
        .get_for_node(&storage_node.id)
        .await
        .unwrap();
    let RoleState::Storage { s3_buckets } = state.role else {
        panic!("expected storage state");
    };
    assert_eq!(s3_buckets.len(), 1);
    assert!(s3_buckets[0].public);
    assert_eq!(s3_buckets[0].quota_bytes, 1 << 30);
}

#[tokio::test]
async fn test_failed_sub_query_fails_whole_document() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let node = ctx.node(&shard, "web-1a").await;
    let tenant = ctx.active_tenant("acme", &shard).await;
    let webroot = ctx.active_webroot(&tenant, "main").await;

    sqlx::query("UPDATE webroots SET runtime_config = 'not json' WHERE id = $1")
        .bind(&webroot.id)
        .execute(ctx.store.pool())
        .await
        .unwrap();

    let err = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap_err();
    match err {
        CoreError::PartialFailure { node_id, stage, .. } => {
            assert_eq!(node_id, node.id);
            assert_eq!(stage, "runtime_config");
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_store_error_in_loader_is_partial_failure() {
    let ctx = TestContext::new().await;
    let shard = ctx.shard("web-1", ShardRole::Web).await;
    let node = ctx.node(&shard, "web-1a").await;
    ctx.active_tenant("acme", &shard).await;

    sqlx::query("DROP TABLE ssh_keys")
        .execute(ctx.store.pool())
        .await
        .unwrap();

    let err = ctx
        .services
        .desired_state
        .get_for_node(&node.id)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "PARTIAL_FAILURE");
    assert!(err.to_string().contains("ssh_keys"));

    // Store calls outside the loaders still report persistence errors.
    let err = ctx.store.list_ssh_keys("t", &[]).await.unwrap_err();
    assert_eq!(err.error_code(), "PERSISTENCE_ERROR");
}
