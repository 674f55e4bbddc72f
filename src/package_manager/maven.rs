use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Result;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::PackageManager;
use crate::package::Package;

/// Maven projects: `pom.xml`, with license metadata read from the POMs in
/// the local repository (`<localRepository>` from `~/.m2/settings.xml`,
/// otherwise `~/.m2/repository`).
pub struct Maven {
    project_path: PathBuf,
    repository: Option<PathBuf>,
}

impl Maven {
    pub fn new(project_path: &Path) -> Self {
        let maven = Self {
            project_path: project_path.to_path_buf(),
            repository: None,
        };
        match local_repository() {
            Some(repository) => maven.with_repository(repository),
            None => maven,
        }
    }

    pub fn build(project_path: &Path) -> Box<dyn PackageManager> {
        Box::new(Self::new(project_path))
    }

    /// Read installed POMs from `repository`.
    pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
        self.repository = Some(repository.into());
        self
    }
}

impl PackageManager for Maven {
    fn name(&self) -> &'static str {
        "maven"
    }

    fn project_path(&self) -> &Path {
        &self.project_path
    }

    fn markers(&self) -> &'static [&'static str] {
        &["pom.xml"]
    }

    fn current_packages(&self) -> Result<Vec<Box<dyn Package>>> {
        let pom_path = self.project_path.join("pom.xml");
        if !pom_path.exists() {
            return Ok(Vec::new());
        }

        let pom = parse_pom(&std::fs::read_to_string(&pom_path)?)?;
        Ok(pom
            .dependencies
            .into_iter()
            .map(|dep| {
                Box::new(MavenPackage::new(dep, self.repository.as_deref())) as Box<dyn Package>
            })
            .collect())
    }
}

/// A `<dependency>` entry.
#[derive(Debug, Default, Clone, PartialEq)]
struct Coordinates {
    group_id: String,
    artifact_id: String,
    version: String,
    scope: String,
}

/// The parts of a POM this adapter cares about.
#[derive(Debug, Default)]
struct Pom {
    description: String,
    url: String,
    licenses: Vec<String>,
    dependencies: Vec<Coordinates>,
}

pub struct MavenPackage {
    name: String,
    version: String,
    description: String,
    homepage: String,
    groups: BTreeSet<String>,
    children: Vec<String>,
    install_path: Option<PathBuf>,
    licenses: Vec<String>,
}

impl MavenPackage {
    fn new(dep: Coordinates, repository: Option<&Path>) -> Self {
        let artifact_dir = repository.map(|repo| {
            dep.group_id
                .split('.')
                .fold(repo.to_path_buf(), |dir, part| dir.join(part))
                .join(&dep.artifact_id)
                .join(&dep.version)
        });
        let install_path = artifact_dir.filter(|dir| dir.is_dir());
        let pom = install_path
            .as_deref()
            .map(|dir| dir.join(format!("{}-{}.pom", dep.artifact_id, dep.version)))
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|content| parse_pom(&content).ok())
            .unwrap_or_default();

        let mut groups = BTreeSet::new();
        if !dep.scope.is_empty() && dep.scope != "compile" {
            groups.insert(dep.scope.clone());
        }

        Self {
            name: if dep.group_id.is_empty() {
                dep.artifact_id.clone()
            } else {
                format!("{}:{}", dep.group_id, dep.artifact_id)
            },
            version: dep.version,
            description: pom.description,
            homepage: pom.url,
            groups,
            children: pom
                .dependencies
                .into_iter()
                .map(|c| format!("{}:{}", c.group_id, c.artifact_id))
                .collect(),
            install_path,
            licenses: pom.licenses,
        }
    }
}

impl Package for MavenPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn summary(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn homepage(&self) -> &str {
        &self.homepage
    }

    fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    fn children(&self) -> &[String] {
        &self.children
    }

    fn install_path(&self) -> Option<&Path> {
        self.install_path.as_deref()
    }

    fn license_names_from_spec(&self) -> Vec<String> {
        self.licenses.clone()
    }
}

/// The user's local Maven repository, honoring `<localRepository>` in
/// `~/.m2/settings.xml`.
fn local_repository() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let m2 = home.join(".m2");

    let configured = std::fs::read_to_string(m2.join("settings.xml"))
        .ok()
        .and_then(|content| match parse_local_repository(&content) {
            Ok(found) => found,
            Err(err) => {
                log::debug!("ignoring unreadable Maven settings: {}", err);
                None
            }
        });

    Some(match configured {
        Some(dir) => PathBuf::from(dir.replace("${user.home}", &home.to_string_lossy())),
        None => m2.join("repository"),
    })
}

/// The `<settings><localRepository>` value of a Maven settings file.
fn parse_local_repository(content: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                path.push(String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned());
            }
            Event::End(_) => {
                path.pop();
            }
            Event::Text(ref e) if is_path(&path, &["settings", "localRepository"]) => {
                let text = e.unescape()?.to_string();
                if !text.is_empty() {
                    return Ok(Some(text));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

/// Parse a POM using the quick-xml event API, tracking the element path so
/// that `<dependencyManagement>` and plugin dependencies are not mistaken for
/// project dependencies. `${property}` references in versions are resolved
/// against `<properties>`.
fn parse_pom(content: &str) -> Result<Pom> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut pom = Pom::default();
    let mut properties: HashMap<String, String> = HashMap::new();
    let mut path: Vec<String> = Vec::new();
    let mut current = Coordinates::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                path.push(name);
                if is_path(&path, &["project", "dependencies", "dependency"]) {
                    current = Coordinates::default();
                }
            }
            Event::End(_) => {
                if is_path(&path, &["project", "dependencies", "dependency"])
                    && !current.artifact_id.is_empty()
                {
                    pom.dependencies.push(std::mem::take(&mut current));
                }
                path.pop();
            }
            Event::Text(ref e) => {
                let text = e.unescape().unwrap_or_default().to_string();
                let segments: Vec<&str> = path.iter().map(String::as_str).collect();
                match segments.as_slice() {
                    ["project", "description"] => pom.description = text,
                    ["project", "url"] => pom.url = text,
                    ["project", "licenses", "license", "name"] => pom.licenses.push(text),
                    ["project", "properties", key] => {
                        properties.insert(key.to_string(), text);
                    }
                    ["project", "dependencies", "dependency", field] => match *field {
                        "groupId" => current.group_id = text,
                        "artifactId" => current.artifact_id = text,
                        "version" => current.version = text,
                        "scope" => current.scope = text,
                        _ => {}
                    },
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    for dep in &mut pom.dependencies {
        if let Some(key) = dep
            .version
            .strip_prefix("${")
            .and_then(|v| v.strip_suffix('}'))
        {
            if let Some(value) = properties.get(key) {
                dep.version = value.clone();
            }
        }
    }

    Ok(pom)
}

fn is_path(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::spdx::Catalog;
    use crate::license::License;
    use crate::package::{LogLicenseLogger, Resolver};
    use std::fs;
    use tempfile::TempDir;

    const PROJECT_POM: &str = r#"<?xml version="1.0"?>
<project>
  <properties>
    <commons.version>3.12.0</commons.version>
  </properties>
  <dependencyManagement>
    <dependencies>
      <dependency>
        <groupId>managed</groupId>
        <artifactId>only-managed</artifactId>
        <version>1.0</version>
      </dependency>
    </dependencies>
  </dependencyManagement>
  <dependencies>
    <dependency>
      <groupId>org.apache.commons</groupId>
      <artifactId>commons-lang3</artifactId>
      <version>${commons.version}</version>
    </dependency>
    <dependency>
      <groupId>junit</groupId>
      <artifactId>junit</artifactId>
      <version>4.13.2</version>
      <scope>test</scope>
    </dependency>
  </dependencies>
</project>"#;

    const COMMONS_POM: &str = r#"<?xml version="1.0"?>
<project>
  <description>Apache Commons Lang</description>
  <url>https://commons.apache.org/proper/commons-lang/</url>
  <licenses>
    <license>
      <name>Apache License, Version 2.0</name>
      <url>https://www.apache.org/licenses/LICENSE-2.0.txt</url>
    </license>
  </licenses>
</project>"#;

    #[test]
    fn test_parse_pom_dependencies() {
        let pom = parse_pom(PROJECT_POM).unwrap();
        assert_eq!(pom.dependencies.len(), 2);
        assert_eq!(pom.dependencies[0].artifact_id, "commons-lang3");
        assert_eq!(pom.dependencies[0].version, "3.12.0");
        assert_eq!(pom.dependencies[1].scope, "test");
    }

    #[test]
    fn test_parse_local_repository() {
        let settings = r#"<?xml version="1.0"?>
<settings xmlns="http://maven.apache.org/SETTINGS/1.0.0">
  <localRepository>${user.home}/maven-cache</localRepository>
  <offline>false</offline>
</settings>"#;
        assert_eq!(
            parse_local_repository(settings).unwrap(),
            Some("${user.home}/maven-cache".to_string())
        );

        let defaults = r#"<settings><offline>true</offline></settings>"#;
        assert_eq!(parse_local_repository(defaults).unwrap(), None);
    }

    #[test]
    fn test_packages_resolve_from_local_repository() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("pom.xml"), PROJECT_POM).unwrap();

        let repo = TempDir::new().unwrap();
        let artifact = repo.path().join("org/apache/commons/commons-lang3/3.12.0");
        fs::create_dir_all(&artifact).unwrap();
        fs::write(artifact.join("commons-lang3-3.12.0.pom"), COMMONS_POM).unwrap();

        let maven = Maven::new(project.path()).with_repository(repo.path());
        assert!(maven.active().unwrap());
        let packages = maven.current_packages().unwrap();
        assert_eq!(packages.len(), 2);

        let commons = &packages[0];
        assert_eq!(commons.name(), "org.apache.commons:commons-lang3");
        assert_eq!(commons.description(), "Apache Commons Lang");
        assert_eq!(commons.install_path(), Some(artifact.as_path()));

        let resolver = Resolver::new(&Catalog, &LogLicenseLogger);
        let licenses: Vec<License> = commons.determine_license(&resolver).into_iter().collect();
        assert_eq!(licenses, vec![License::new("Apache-2.0")]);

        let junit = &packages[1];
        assert!(junit.groups().contains("test"));
        assert!(junit.install_path().is_none());
        let licenses: Vec<License> = junit.determine_license(&resolver).into_iter().collect();
        assert_eq!(licenses, vec![License::new("unknown")]);
    }
}
