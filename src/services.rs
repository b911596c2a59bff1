//! Well-known TCP service names.
//!
//! Purely informational: the name is shown next to a port in reports and has
//! no influence on how the port is probed.

/// Look up the conventional service name for a TCP port.
pub fn service_name(port: u16) -> Option<&'static str> {
    let name = match port {
        20 => "ftp-data",
        21 => "ftp",
        22 => "ssh",
        23 => "telnet",
        25 => "smtp",
        53 => "domain",
        80 => "http",
        88 => "kerberos",
        110 => "pop3",
        111 => "rpcbind",
        135 => "msrpc",
        139 => "netbios-ssn",
        143 => "imap",
        389 => "ldap",
        443 => "https",
        445 => "microsoft-ds",
        465 => "smtps",
        587 => "submission",
        631 => "ipp",
        636 => "ldaps",
        873 => "rsync",
        993 => "imaps",
        995 => "pop3s",
        1080 => "socks",
        1433 => "mssql",
        1521 => "oracle",
        1723 => "pptp",
        1883 => "mqtt",
        2049 => "nfs",
        2375 => "docker",
        3000 => "ppp",
        3128 => "squid-http",
        3306 => "mysql",
        3389 => "ms-wbt-server",
        5432 => "postgresql",
        5672 => "amqp",
        5900 => "vnc",
        5984 => "couchdb",
        6379 => "redis",
        6443 => "kubernetes-api",
        8000 | 8008 | 8888 => "http-alt",
        8080 => "http-proxy",
        8443 => "https-alt",
        9000 => "cslistener",
        9042 => "cassandra",
        9092 => "kafka",
        9200 => "elasticsearch",
        11211 => "memcache",
        27017 => "mongodb",
        _ => return None,
    };
    Some(name)
}

/// Ports whose services usually wait for the client to speak first over
/// plain HTTP.
pub fn is_http_port(port: u16) -> bool {
    matches!(port, 80 | 8000 | 8008 | 8080 | 8081 | 8888 | 9000)
}
