mod common;

use common::{FakeCloud, FakeRegistry};
use std::path::Path;
use tagflow_cloud::context::DEFAULT_DEBIAN_IMAGE_OWNER;
use tagflow_cloud::{
    AutoConfirm, CloudError, DesiredState, DesiredStateStore, InstanceSpec, ParamValue,
    ReconcileDriver, ReconcileSettings, ResourceKind, RouteTarget,
};

const INFRA: &str = r#"
eu:
- nat-aza:
  - type: t2.micro
    customer: foo
    name: foo-nat-1
    image: debian-stretch-*
    key: ops
    ipaddr: 10.1.0.10
    sg: [nat]
    srcdstchk: false
    pubip: true
- web-aza:
  - type: t2.small
    customer: foo
    name: foo-www-1
    image: debian-stretch-*
    key: ops
    ipaddr: 10.1.1.10
    sg: [web]
    data: 20
    comment: frontend
    elb: {sg: [elb-web]}
  web-azb:
  - type: t2.small
    customer: foo
    name: foo-www-2
    image: debian-stretch-*
    key: ops
    ipaddr: 10.1.2.10
    sg: [web]
    elb: {sg: [elb-web]}
- foo-rds:
  - type: db.t2.micro
    customer: foo
    name: foo-db
    data: 5
    dbengine: MySQL
    dbversion: 5.6.22
    dbroot: root
    subnets: {aza: 10.1.3.0/24, azb: 10.1.4.0/24}
    sg:
    - name: MySQL_from_web
      tag: mysql-from-web
      cidr: [10.1.1.0/24, 10.1.2.0/24]
      port: 3306
    multiaz: true
"#;

fn cloud() -> FakeCloud {
    let cloud = FakeCloud::new("eu").with_image(
        "ami-b",
        "debian-stretch-b",
        "2021-06-01T00:00:00.000Z",
        Some(DEFAULT_DEBIAN_IMAGE_OWNER),
    );
    cloud.seed(ResourceKind::SecurityGroup, "sg-nat", "nat");
    cloud.seed(ResourceKind::SecurityGroup, "sg-web", "web");
    cloud.seed(ResourceKind::SecurityGroup, "sg-elb", "elb-web");
    cloud
}

fn write_infra(dir: &Path, content: &str) -> DesiredStateStore {
    let path = dir.join("infra.yaml");
    std::fs::write(&path, content).unwrap();
    DesiredStateStore::new(path)
}

fn discovered_ids(state: &DesiredState, region: &str) -> Vec<Option<String>> {
    state
        .groups(region)
        .unwrap()
        .iter()
        .flat_map(|g| g.instances.iter())
        .map(|v| InstanceSpec::from_value(v).unwrap().discovered_id)
        .collect()
}

#[tokio::test]
async fn test_full_run_then_rerun() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_infra(dir.path(), INFRA);
    let registry = FakeRegistry::new(cloud());
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(true);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    let report = driver.run(&mut state).await.unwrap();

    let cloud = &registry.cloud;
    assert_eq!(cloud.count("create_subnet"), 5);
    assert_eq!(cloud.count("create_route_table"), 2);
    assert_eq!(cloud.count("associate_route_table"), 5);
    assert_eq!(cloud.count("create_route"), 2);
    assert_eq!(cloud.count("run_instance"), 3);
    assert_eq!(cloud.count("set_source_dest_check"), 1);
    assert_eq!(cloud.count("create_load_balancer"), 1);
    assert_eq!(cloud.count("register_instance"), 2);
    assert_eq!(cloud.count("create_security_group"), 1);
    assert_eq!(cloud.count("create_db_subnet_group"), 1);
    assert_eq!(cloud.count("create_db_instance"), 1);
    assert_eq!(report.summary().created, 16);

    // every compute instance got its id persisted, the database did not
    let persisted = store.load().await.unwrap();
    let ids = discovered_ids(&persisted, "eu");
    assert!(ids[..3].iter().all(Option::is_some));
    assert_eq!(ids[3], None);
    assert_eq!(persisted, state);
    let nat_id = ids[0].clone().unwrap();

    {
        let fake = cloud.state.lock().unwrap();
        // the web route table was created before the NAT instance existed,
        // the database one after
        assert_eq!(fake.routes[0].2, RouteTarget::Gateway("igw-0001".to_string()));
        assert_eq!(fake.routes[1].2, RouteTarget::Instance(nat_id));

        let lb = &fake.lb_requests[0];
        assert_eq!(lb.name, "elb-foo-www");
        assert_eq!(lb.subnet_ids.len(), 2);
        assert_eq!(lb.security_group_ids, vec!["sg-elb"]);
        assert_eq!(lb.listeners[0].load_balancer_port, 80);
        assert_eq!(
            lb.tags,
            vec![
                ("Name".to_string(), "elb-foo-www".to_string()),
                ("Customer".to_string(), "foo".to_string()),
            ]
        );

        let db = &fake.db_requests[0];
        assert_eq!(db.subnet_group, "foords");
        assert_eq!(db.master_password.len(), 20);
        assert_eq!(db.options.get("MultiAZ"), Some(&ParamValue::Bool(true)));
        assert!(!db.options.contains_key("Iops"));
        assert_eq!(fake.sg_requests[0].rules.len(), 2);
    }

    // second pass over the persisted document
    let mut state = store.load().await.unwrap();
    let report = driver.run(&mut state).await.unwrap();

    assert_eq!(cloud.count("create_subnet"), 5);
    assert_eq!(cloud.count("create_route_table"), 2);
    assert_eq!(cloud.count("associate_route_table"), 5);
    assert_eq!(cloud.count("create_route"), 2);
    assert_eq!(cloud.count("run_instance"), 3);
    assert_eq!(cloud.count("create_load_balancer"), 1);
    assert_eq!(cloud.count("create_security_group"), 1);
    assert_eq!(cloud.count("create_db_subnet_group"), 1);
    assert_eq!(cloud.count("create_db_instance"), 1);
    // post-creation steps are re-applied
    assert_eq!(cloud.count("register_instance"), 4);
    assert_eq!(cloud.count("set_source_dest_check"), 2);

    let summary = report.summary();
    assert_eq!(summary.created, 0);
    assert_eq!(summary.skipped, 3);
}

#[tokio::test]
async fn test_instance_with_discovered_id_is_never_launched() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_infra(
        dir.path(),
        "eu:\n- web-aza:\n  - {type: t2.micro, customer: foo, name: foo-www-1, image: debian-*, key: ops, ipaddr: 10.1.1.10, awsid: i-existing}\n",
    );
    let registry = FakeRegistry::new(cloud());
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(true);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    driver.run(&mut state).await.unwrap();

    assert_eq!(registry.cloud.count("run_instance"), 0);
    assert_eq!(
        discovered_ids(&state, "eu"),
        vec![Some("i-existing".to_string())]
    );
}

#[tokio::test]
async fn test_rewrite_preserves_unrelated_content() {
    let dir = tempfile::tempdir().unwrap();
    let content = "eu:\n- web-aza:\n  - type: t2.micro\n    customer: foo\n    name: foo-www-1\n    image: debian-*\n    key: ops\n    ipaddr: 10.1.1.10\n    comment: frontend\n    ports: [80, 443]\n  - type: t2.micro\n    customer: foo\n    name: foo-www-3\n    image: debian-*\n    key: ops\n    ipaddr: 10.1.1.11\n    awsid: i-manual\n";
    let store = write_infra(dir.path(), content);
    let registry = FakeRegistry::new(cloud());
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(true);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    driver.run(&mut state).await.unwrap();

    let saved = std::fs::read_to_string(store.path()).unwrap();
    let saved: serde_yaml::Value = serde_yaml::from_str(&saved).unwrap();
    let first = &saved["eu"][0]["web-aza"][0];
    assert_eq!(first["comment"].as_str(), Some("frontend"));
    assert_eq!(first["ports"][1].as_u64(), Some(443));
    assert!(first["awsid"].as_str().unwrap().starts_with("i-"));
    let second = &saved["eu"][0]["web-aza"][1];
    assert_eq!(second["awsid"].as_str(), Some("i-manual"));
    assert_eq!(second["name"].as_str(), Some("foo-www-3"));

    let backup = std::fs::read_to_string(dir.path().join("infra.yaml.bak")).unwrap();
    assert_eq!(backup, content);
}

#[tokio::test]
async fn test_vpc_entry_selects_vpc_by_name() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_infra(
        dir.path(),
        "eu:\n- vpc: infra\n- web-aza:\n  - {type: t2.micro, customer: foo, name: foo-www-1, image: debian-*, key: ops, ipaddr: 10.1.1.10}\n",
    );
    let cloud = cloud();
    cloud.seed(ResourceKind::Vpc, "vpc-infra", "infra");
    let registry = FakeRegistry::new(cloud);
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(true);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    driver.run(&mut state).await.unwrap();

    assert!(
        registry
            .cloud
            .calls()
            .contains(&"create_subnet vpc-infra 10.1.1.0/24 eu-central-1a".to_string())
    );
}

#[tokio::test]
async fn test_unknown_vpc_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_infra(dir.path(), "eu:\n- vpc: nowhere\n- web-aza: []\n");
    let registry = FakeRegistry::new(cloud());
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(true);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    let err = driver.run(&mut state).await.unwrap_err();
    assert!(matches!(err, CloudError::Config(ref m) if m.contains("nowhere")));
}

#[tokio::test]
async fn test_declined_gateway_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let store = write_infra(dir.path(), INFRA);
    let registry = FakeRegistry::new(cloud());
    let settings = ReconcileSettings::default();
    let confirm = AutoConfirm(false);
    let driver = ReconcileDriver::new(&registry, &settings, &confirm, &store);

    let mut state = store.load().await.unwrap();
    let err = driver.run(&mut state).await.unwrap_err();

    assert!(err.is_operator_abort());
    assert_eq!(registry.cloud.count("run_instance"), 0);
    assert!(!dir.path().join("infra.yaml.bak").exists());
}
