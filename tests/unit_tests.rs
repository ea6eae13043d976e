use clap::Parser;
use redis_mysql_sync::{MySQLOpts, RedisOpts};

#[test]
fn test_redis_opts_defaults() {
    let opts = RedisOpts::parse_from(["test"]);

    assert_eq!(opts.redis_host, "127.0.0.1");
    assert_eq!(opts.redis_port, 6379);
    assert_eq!(opts.redis_db, 0);
    assert!(opts.redis_password.is_none());
}

#[test]
fn test_redis_opts_conversion() {
    let opts = RedisOpts::parse_from(["test", "--redis-db", "15", "--redis-password", "hunter2"]);
    let connect: redis_source::RedisConnectOpts = (&opts).into();

    assert_eq!(connect.db, 15);
    assert_eq!(connect.password.as_deref(), Some("hunter2"));
}

#[test]
fn test_mysql_opts_require_database() {
    assert!(MySQLOpts::try_parse_from(["test"]).is_err());

    let opts = MySQLOpts::parse_from(["test", "--mysql-database", "spider01"]);
    assert_eq!(opts.mysql_host, "127.0.0.1");
    assert_eq!(opts.mysql_port, 3306);
    assert_eq!(opts.mysql_user, "root");
    assert_eq!(opts.mysql_database, "spider01");
}

#[test]
fn test_debug_redacts_passwords() {
    let redis = RedisOpts::parse_from(["test", "--redis-password", "hunter2"]);
    let mysql = MySQLOpts::parse_from([
        "test",
        "--mysql-database",
        "spider01",
        "--mysql-password",
        "s3cret",
    ]);

    assert!(!format!("{redis:?}").contains("hunter2"));
    assert!(!format!("{mysql:?}").contains("s3cret"));
    assert!(format!("{mysql:?}").contains("spider01"));
}
