//! Parsing and resolution of PDPT/PDPTWT instance files.
//!
//! Instances are tab-delimited text: a parameter-name line, a value line, a
//! blank line, a column-header line for the node records and then one
//! record per node. The node count is `2*nr + 2*nv + nt`. Node labels
//! encode the kind in their first character (`o1`, `e1`, `p3`, `d3`, `t1`);
//! a delivery `dN` is paired with pickup `pN`, a destination depot `eN`
//! with origin depot `oN`.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::network::{Graph, Node, NodeKind, Request, Vehicle};

/// Fleet capacity of the benchmark instances (the Q100 family).
pub const VEHICLE_CAPACITY: u32 = 100;

/// A loaded instance: the complete network plus its fleet and requests.
#[derive(Debug, Clone)]
pub struct Instance {
    pub name: String,
    pub graph: Graph,
    pub vehicles: Vec<Vehicle>,
    pub requests: Vec<Request>,
}

impl Instance {
    /// Loads an instance file. With `sampaio` set, destination-depot
    /// records are skipped and each vehicle's origin depot doubles as its
    /// destination (the closed-loop convention); node indices still
    /// advance over the skipped records.
    pub fn from_file<P: AsRef<Path>>(path: P, sampaio: bool) -> Result<Self, String> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| format!("cannot open {}: {}", path.display(), e))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(&name, BufReader::new(file), sampaio)
    }

    /// Parses an instance from any buffered reader.
    pub fn from_reader<R: BufRead>(name: &str, reader: R, sampaio: bool) -> Result<Self, String> {
        let mut lines = reader.lines().map(|l| l.map_err(|e| format!("read error: {}", e)));

        let mut next_line = |what: &str| -> Result<String, String> {
            lines.next().ok_or_else(|| format!("unexpected end of file before {}", what))?
        };

        let param_names = next_line("parameter names")?;
        let param_values = next_line("parameter values")?;
        let params: HashMap<&str, &str> = param_names
            .trim_end()
            .split('\t')
            .zip(param_values.trim_end().split('\t'))
            .collect();

        let read_param = |key: &str| -> Result<usize, String> {
            params
                .get(key)
                .ok_or_else(|| format!("missing parameter '{}'", key))?
                .parse::<usize>()
                .map_err(|_| format!("invalid parameter '{}'", key))
        };
        let nr = read_param("nr")?;
        let nv = read_param("nv")?;
        let nt = read_param("nt")?;

        next_line("blank separator")?;
        let header = next_line("node record header")?;
        let columns: Vec<&str> = header.trim_end().split('\t').collect();

        let n_nodes = 2 * nr + 2 * nv + nt;

        let mut nodes: Vec<Node> = Vec::with_capacity(n_nodes);
        let mut pickup_pos: HashMap<String, usize> = HashMap::new();
        let mut origin_pos: HashMap<String, usize> = HashMap::new();
        let mut requests = Vec::with_capacity(nr);
        let mut vehicles = Vec::with_capacity(nv);
        let mut i_requests = 0;
        let mut i_vehicles = 0;

        for i in 0..n_nodes {
            let line = next_line("node record")?;
            let record: HashMap<&str, &str> =
                columns.iter().copied().zip(line.trim_end().split('\t')).collect();

            let label = record_field(&record, i, "node")?.to_string();
            let tag = label
                .chars()
                .next()
                .ok_or_else(|| format!("node record {}: empty node label", i))?;
            let kind = NodeKind::from_tag(tag)?;
            let coordinates = (record_int(&record, i, "x")?, record_int(&record, i, "y")?);
            let earliest = record_int(&record, i, "a")? as f64;
            let latest = record_int(&record, i, "b")? as f64;

            if sampaio && kind == NodeKind::DestinationDepot {
                continue;
            }

            let node = Node::new(i, kind, coordinates, earliest, latest)?;

            match kind {
                NodeKind::Pickup => {
                    pickup_pos.insert(label.clone(), nodes.len());
                }
                NodeKind::Delivery => {
                    let pickup_label = format!("p{}", &label[1..]);
                    let &pos = pickup_pos.get(&pickup_label).ok_or_else(|| {
                        format!("delivery '{}' has no matching pickup '{}'", label, pickup_label)
                    })?;
                    let load = record_int(&record, i, "load")?.unsigned_abs() as u32;
                    requests.push(Request::new(i_requests, &nodes[pos], &node, load)?);
                    i_requests += 1;
                }
                NodeKind::OriginDepot => {
                    if sampaio {
                        vehicles.push(Vehicle::new(
                            i_vehicles,
                            &node,
                            &node,
                            VEHICLE_CAPACITY,
                            1.0,
                        )?);
                        i_vehicles += 1;
                    } else {
                        origin_pos.insert(label.clone(), nodes.len());
                    }
                }
                NodeKind::DestinationDepot => {
                    let origin_label = format!("o{}", &label[1..]);
                    let &pos = origin_pos.get(&origin_label).ok_or_else(|| {
                        format!(
                            "destination depot '{}' has no matching origin '{}'",
                            label, origin_label
                        )
                    })?;
                    vehicles.push(Vehicle::new(
                        i_vehicles,
                        &nodes[pos],
                        &node,
                        VEHICLE_CAPACITY,
                        1.0,
                    )?);
                    i_vehicles += 1;
                }
                NodeKind::TransferStation => {}
            }

            nodes.push(node);
        }

        let graph = Graph::complete(nodes)?;
        log::debug!(
            "{}: {} nodes, {} vehicles, {} requests (sampaio={})",
            name,
            graph.num_nodes(),
            vehicles.len(),
            requests.len(),
            sampaio
        );
        Ok(Instance { name: name.to_string(), graph, vehicles, requests })
    }
}

fn record_field<'a>(
    record: &HashMap<&str, &'a str>,
    row: usize,
    key: &str,
) -> Result<&'a str, String> {
    record
        .get(key)
        .copied()
        .ok_or_else(|| format!("node record {}: missing column '{}'", row, key))
}

fn record_int(record: &HashMap<&str, &str>, row: usize, key: &str) -> Result<i64, String> {
    record_field(record, row, key)?
        .parse::<i64>()
        .map_err(|_| format!("node record {}: invalid '{}'", row, key))
}

/// True for instance names of the time-windowed benchmark family
/// (`{r}R-{k}K-{t}T-{shift}{L|M|S}-{n}`).
pub fn is_pdptwt_name(name: &str) -> bool {
    let name = name.strip_suffix(".txt").unwrap_or(name);
    let parts: Vec<&str> = name.split('-').collect();
    parts.len() == 5
        && parts[0].strip_suffix('R').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[1].strip_suffix('K').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[2].strip_suffix('T').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[3].len() >= 2
        && parts[3].ends_with(['L', 'M', 'S'])
        && parts[3][..parts[3].len() - 1].parse::<u32>().is_ok()
        && parts[4].parse::<u32>().is_ok()
}

/// True for instance names of the PDPT benchmark family
/// (`PDPT-R{r}-K{k}-T{t}-Q100-{n}`).
pub fn is_pdpt_name(name: &str) -> bool {
    let name = name.strip_suffix(".txt").unwrap_or(name);
    let parts: Vec<&str> = name.split('-').collect();
    parts.len() == 6
        && parts[0] == "PDPT"
        && parts[1].strip_prefix('R').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[2].strip_prefix('K').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[3].strip_prefix('T').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[4].strip_prefix('Q').map_or(false, |v| v.parse::<u32>().is_ok())
        && parts[5].parse::<u32>().is_ok()
}

/// Maps a benchmark instance name to its path under the data root:
/// `PDPT/PDPT-R5-K2-T1/PDPT-R5-K2-T1-Q100-6.txt` for the PDPT family and
/// `PDPTWT/5R2K1T/5R-2K-1T-8L-3.txt` for the time-windowed one. Returns
/// `None` for names matching neither pattern.
pub fn resolve_instance_path(name: &str, data_root: &Path) -> Option<PathBuf> {
    let name = name.strip_suffix(".txt").unwrap_or(name);
    if is_pdpt_name(name) {
        let parts: Vec<&str> = name.split('-').collect();
        let config = parts[..4].join("-");
        return Some(data_root.join("PDPT").join(config).join(format!("{}.txt", name)));
    }
    if is_pdptwt_name(name) {
        let parts: Vec<&str> = name.split('-').collect();
        let config = parts[..3].join("");
        return Some(data_root.join("PDPTWT").join(config).join(format!("{}.txt", name)));
    }
    None
}

/// Loads every `.txt` instance in a directory, sorted by name.
pub fn load_instances_from_dir<P: AsRef<Path>>(dir: P, sampaio: bool) -> Vec<Instance> {
    let mut instances = Vec::new();

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "txt").unwrap_or(false) {
                match Instance::from_file(&path, sampaio) {
                    Ok(instance) => instances.push(instance),
                    Err(e) => log::warn!("skipping {}: {}", path.display(), e),
                }
            }
        }
    }

    instances.sort_by(|a, b| a.name.cmp(&b.name));
    instances
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SMALL: &str = "nr\tnv\tnt\n\
                         1\t1\t1\n\
                         \n\
                         node\tx\ty\ta\tb\tload\n\
                         o1\t0\t0\t0\t960\t0\n\
                         e1\t25\t0\t0\t960\t0\n\
                         p1\t10\t0\t0\t960\t10\n\
                         d1\t15\t0\t0\t960\t-10\n\
                         t1\t20\t5\t0\t960\t0\n";

    #[test]
    fn test_parse_small_instance() {
        let instance = Instance::from_reader("small", Cursor::new(SMALL), false).unwrap();

        assert_eq!(instance.graph.num_nodes(), 5);
        assert_eq!(instance.graph.arcs().len(), 20);
        assert_eq!(instance.vehicles.len(), 1);
        assert_eq!(instance.requests.len(), 1);

        let k = &instance.vehicles[0];
        assert_eq!(k.origin, 0);
        assert_eq!(k.dest, 1);
        assert_eq!(k.capacity, VEHICLE_CAPACITY);

        let r = &instance.requests[0];
        assert_eq!(r.pickup, 2);
        assert_eq!(r.destination, 3);
        assert_eq!(r.load, 10);

        assert_eq!(instance.graph.node(4).unwrap().kind, NodeKind::TransferStation);
    }

    #[test]
    fn test_parse_sampaio_mode_collapses_depots() {
        let instance = Instance::from_reader("small", Cursor::new(SMALL), true).unwrap();

        // e1 is skipped, but indices keep advancing over it
        assert_eq!(instance.graph.num_nodes(), 4);
        assert!(instance.graph.node(1).is_none());
        assert_eq!(instance.graph.node(2).unwrap().kind, NodeKind::Pickup);

        let k = &instance.vehicles[0];
        assert_eq!(k.origin, 0);
        assert_eq!(k.dest, 0);
    }

    #[test]
    fn test_parse_rejects_unpaired_delivery() {
        let text = "nr\tnv\tnt\n1\t1\t0\n\nnode\tx\ty\ta\tb\tload\n\
                    o1\t0\t0\t0\t960\t0\n\
                    e1\t25\t0\t0\t960\t0\n\
                    d1\t15\t0\t0\t960\t-10\n\
                    p1\t10\t0\t0\t960\t10\n";
        assert!(Instance::from_reader("bad", Cursor::new(text), false).is_err());
    }

    #[test]
    fn test_parse_rejects_truncated_file() {
        let text = "nr\tnv\tnt\n1\t1\t1\n\nnode\tx\ty\ta\tb\tload\no1\t0\t0\t0\t960\t0\n";
        assert!(Instance::from_reader("bad", Cursor::new(text), false).is_err());
    }

    #[test]
    fn test_name_patterns() {
        assert!(is_pdpt_name("PDPT-R5-K2-T1-Q100-6"));
        assert!(is_pdpt_name("PDPT-R5-K2-T1-Q100-6.txt"));
        assert!(!is_pdpt_name("PDPT-R5-K2-T1"));
        assert!(!is_pdpt_name("5R-2K-1T-8L-3"));

        assert!(is_pdptwt_name("5R-2K-1T-8L-3"));
        assert!(is_pdptwt_name("10R-3K-2T-6M-0.txt"));
        assert!(!is_pdptwt_name("5R-2K-1T-8X-3"));
        assert!(!is_pdptwt_name("PDPT-R5-K2-T1-Q100-6"));
    }

    #[test]
    fn test_resolve_paths() {
        let root = Path::new("data");
        assert_eq!(
            resolve_instance_path("PDPT-R5-K2-T1-Q100-6", root),
            Some(PathBuf::from("data/PDPT/PDPT-R5-K2-T1/PDPT-R5-K2-T1-Q100-6.txt"))
        );
        assert_eq!(
            resolve_instance_path("5R-2K-1T-8L-3", root),
            Some(PathBuf::from("data/PDPTWT/5R2K1T/5R-2K-1T-8L-3.txt"))
        );
        assert_eq!(resolve_instance_path("not-an-instance", root), None);
    }
}
