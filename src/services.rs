//! Service detection based on well-known port numbers.
//!
//! Provides mapping from port numbers to likely service names.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Label reported for ports outside the table.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Static map of well-known ports to service names.
static PORT_SERVICES: LazyLock<HashMap<u16, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(20, "FTP-data");
    m.insert(21, "FTP");
    m.insert(22, "SSH");
    m.insert(23, "Telnet");
    m.insert(25, "SMTP");
    m.insert(53, "DNS");
    m.insert(80, "HTTP");
    m.insert(110, "POP3");
    m.insert(111, "RPCbind");
    m.insert(119, "NNTP");
    m.insert(123, "NTP");
    m.insert(135, "RPC");
    m.insert(137, "NetBIOS-ns");
    m.insert(138, "NetBIOS-dgm");
    m.insert(139, "NetBIOS-ssn");
    m.insert(143, "IMAP");
    m.insert(161, "SNMP");
    m.insert(162, "SNMP-trap");
    m.insert(389, "LDAP");
    m.insert(443, "HTTPS");
    m.insert(445, "SMB");
    m.insert(465, "SMTPS");
    m.insert(514, "Syslog");
    m.insert(515, "LPD");
    m.insert(543, "Kerberos");
    m.insert(544, "Kerberos");
    m.insert(587, "SMTP-submission");
    m.insert(631, "IPP");
    m.insert(636, "LDAPS");
    m.insert(873, "Rsync");
    m.insert(990, "FTPS");
    m.insert(992, "TelnetS");
    m.insert(993, "IMAPS");
    m.insert(995, "POP3S");
    m.insert(1433, "MSSQL");
    m.insert(1521, "Oracle");
    m.insert(1723, "PPTP");
    m.insert(2049, "NFS");
    m.insert(2082, "cPanel");
    m.insert(2083, "cPanelS");
    m.insert(2086, "WHM");
    m.insert(2087, "WHMS");
    m.insert(2181, "ZooKeeper");
    m.insert(2375, "Docker");
    m.insert(2376, "DockerS");
    m.insert(3128, "Squid");
    m.insert(3306, "MySQL");
    m.insert(3389, "RDP");
    m.insert(3690, "SVN");
    m.insert(4333, "MySQL-alt");
    m.insert(4444, "Metasploit");
    m.insert(4500, "IPsec");
    m.insert(5000, "UPnP");
    m.insert(5432, "PostgreSQL");
    m.insert(5555, "FreeSWITCH");
    m.insert(5601, "Kibana");
    m.insert(5666, "Nagios");
    m.insert(5672, "RabbitMQ");
    m.insert(5800, "VNC-http");
    m.insert(5900, "VNC");
    m.insert(5984, "CouchDB");
    m.insert(6000, "X11");
    m.insert(6001, "X11");
    m.insert(6379, "Redis");
    m.insert(6660, "IRC");
    m.insert(6661, "IRC");
    m.insert(6662, "IRC");
    m.insert(6663, "IRC");
    m.insert(6664, "IRC");
    m.insert(6665, "IRC");
    m.insert(6666, "IRC");
    m.insert(6667, "IRC");
    m.insert(6668, "IRC");
    m.insert(6669, "IRC");
    m.insert(6679, "IRC-SSL");
    m.insert(6697, "IRC-SSL");
    m.insert(8000, "HTTP-alt");
    m.insert(8008, "HTTP-alt");
    m.insert(8009, "AJP");
    m.insert(8080, "HTTP-proxy");
    m.insert(8081, "HTTP-alt");
    m.insert(8086, "InfluxDB");
    m.insert(8087, "HTTP-alt");
    m.insert(8090, "HTTP-alt");
    m.insert(8118, "Privoxy");
    m.insert(8123, "Polipo");
    m.insert(8140, "Puppet");
    m.insert(8200, "HTTP-alt");
    m.insert(8222, "HTTP-alt");
    m.insert(8333, "Bitcoin");
    m.insert(8400, "HTTP-alt");
    m.insert(8443, "HTTPS-alt");
    m.insert(8500, "HTTP-alt");
    m.insert(8834, "Nessus");
    m.insert(8888, "HTTP-alt");
    m.insert(8983, "Solr");
    m.insert(9000, "HTTP-alt");
    m.insert(9042, "Cassandra");
    m.insert(9050, "Tor");
    m.insert(9090, "HTTP-alt");
    m.insert(9092, "Kafka");
    m.insert(9100, "Jetdirect");
    m.insert(9200, "Elasticsearch");
    m.insert(9300, "Elasticsearch");
    m.insert(9418, "Git");
    m.insert(9999, "HTTP-alt");
    m.insert(10000, "Webmin");
    m.insert(11211, "Memcached");
    m.insert(15672, "RabbitMQ");
    m.insert(25565, "Minecraft");
    m.insert(27017, "MongoDB");
    m.insert(28017, "MongoDB-http");
    m.insert(32400, "Plex");
    m.insert(50000, "SAP");
    m.insert(50030, "Hadoop");
    m.insert(50060, "Hadoop");
    m.insert(50070, "HDFS");
    m.insert(50075, "HDFS");
    m.insert(50090, "HDFS");
    m.insert(60000, "HTTP-alt");

    m
});

/// Look up the probable service name for a given port.
///
/// Returns `None` if the port is not in the well-known services database.
pub fn known_service(port: u16) -> Option<&'static str> {
    PORT_SERVICES.get(&port).copied()
}

/// Service label for a port, `"unknown"` when unmapped.
pub fn service_name(port: u16) -> &'static str {
    known_service(port).unwrap_or(UNKNOWN_SERVICE)
}
