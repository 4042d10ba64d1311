//! Project-file normalization state machine.
//!
//! One modifier owns one parsed document for the duration of one processing
//! call. The call sequence is fixed: construct, optionally check
//! [`ProjectFileModifier::is_already_processed`], then `parse` → item
//! additions → `compose` → `content`. Transitions are one-directional;
//! calling out of order is a programming error and panics rather than
//! returning a recoverable error.

use anyhow::{Context, Result};
use tracing::debug;

use crate::dom::{create_element_with_items, XmlDocument, XmlElement, XmlNode};
use crate::paths;
use crate::schema;

/// Sentinel comment placed immediately before the document root once
/// composition completes. Matched ordinally, case-sensitive.
pub const PROCESSED_MARKER: &str = "Document is processed by SharpTidy.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModifierState {
    Created,
    Parsed,
    Composed,
}

pub struct ProjectFileModifier {
    document: XmlDocument,
    state: ModifierState,

    /// True when the root declares the MSBuild namespace. Documents in any
    /// other namespace have no recognizable vocabulary: they are left
    /// structurally untouched and only gain the marker.
    namespace_matches: bool,

    compiles: Vec<XmlElement>,
    references: Vec<XmlElement>,
    project_references: Vec<XmlElement>,
    package_references: Vec<XmlElement>,
    analyzers: Vec<XmlElement>,
    additional_files: Vec<XmlElement>,
    other_items: Vec<XmlElement>,
}

impl ProjectFileModifier {
    /// Parse `content` into an owned document. Malformed XML is a
    /// recoverable failure surfaced to the processor boundary.
    pub fn new(content: &str) -> Result<Self> {
        let document =
            XmlDocument::parse(content).context("failed to parse project file document")?;

        let namespace_matches =
            document.root.attribute(schema::XMLNS_ATTRIBUTE) == Some(schema::MSBUILD_NAMESPACE);

        Ok(Self {
            document,
            state: ModifierState::Created,
            namespace_matches,
            compiles: Vec::new(),
            references: Vec::new(),
            project_references: Vec::new(),
            package_references: Vec::new(),
            analyzers: Vec::new(),
            additional_files: Vec::new(),
            other_items: Vec::new(),
        })
    }

    /// Whether the document already carries the processed marker.
    pub fn is_already_processed(&self) -> bool {
        assert!(
            self.state == ModifierState::Created,
            "is_already_processed must be called before parse()"
        );

        self.document
            .prologue
            .iter()
            .chain(self.document.epilogue.iter())
            .any(|node| matches!(node, XmlNode::Comment(text) if text == PROCESSED_MARKER))
    }

    /// Normalize header directives in place, then extract every recognized
    /// item category out of the attribute-less item groups.
    pub fn parse(&mut self) {
        assert!(
            self.state == ModifierState::Created,
            "parse() may only be called once, on a freshly constructed modifier"
        );
        self.state = ModifierState::Parsed;

        if !self.namespace_matches {
            return;
        }

        self.sort_define_constants();
        self.normalize_compile_include_paths();
        self.normalize_hint_paths();

        self.compiles = self.take_items(schema::COMPILE_ELEMENT);
        self.references = self.take_items(schema::REFERENCE_ELEMENT);
        self.project_references = self.take_items(schema::PROJECT_REFERENCE_ELEMENT);
        self.package_references = self.take_items(schema::PACKAGE_REFERENCE_ELEMENT);
        self.analyzers = self.take_items(schema::ANALYZER_ELEMENT);
        self.additional_files = self.take_items(schema::ADDITIONAL_FILES_ELEMENT);

        // Whatever is left inside attribute-less groups is carried over
        // unsorted, after the recognized categories.
        self.other_items = self.take_remaining_items();

        self.remove_empty_item_groups();
    }

    pub fn add_compile_item(&mut self, path: &str) {
        self.assert_mutable("add_compile_item");

        if path.is_empty() {
            debug!("can't add empty compile item");
            return;
        }

        let normalized_path = paths::normalize_separators(path);

        if find_item(&self.compiles, &normalized_path).is_some() {
            debug!("already have compile item '{normalized_path}'");
            return;
        }

        self.compiles.push(
            XmlElement::new(schema::COMPILE_ELEMENT)
                .with_attribute(schema::INCLUDE_ATTRIBUTE, normalized_path),
        );
    }

    pub fn add_analyzer_item(&mut self, path: &str) {
        self.assert_mutable("add_analyzer_item");

        if path.is_empty() {
            debug!("can't add empty analyzer item");
            return;
        }

        let normalized_path = paths::normalize_separators(path);

        if find_item(&self.analyzers, &normalized_path).is_some() {
            debug!("already have analyzer item '{normalized_path}'");
            return;
        }

        self.analyzers.push(
            XmlElement::new(schema::ANALYZER_ELEMENT)
                .with_attribute(schema::INCLUDE_ATTRIBUTE, normalized_path),
        );
    }

    pub fn add_additional_file_item(&mut self, path: &str) {
        self.assert_mutable("add_additional_file_item");

        if path.is_empty() {
            debug!("can't add empty additional file item");
            return;
        }

        let normalized_path = paths::normalize_separators(path);

        if find_item(&self.additional_files, &normalized_path).is_some() {
            debug!("already have additional file item '{normalized_path}'");
            return;
        }

        self.additional_files.push(
            XmlElement::new(schema::ADDITIONAL_FILES_ELEMENT)
                .with_attribute(schema::INCLUDE_ATTRIBUTE, normalized_path),
        );
    }

    /// Add a `PackageReference` with a required version and optional asset
    /// scoping. Duplicate package names (case-insensitive) are skipped.
    pub fn add_package_reference_item(
        &mut self,
        package_name: &str,
        version: &str,
        include_assets: &str,
        private_assets: &str,
    ) {
        self.assert_mutable("add_package_reference_item");

        if package_name.is_empty() {
            debug!("can't add package without name");
            return;
        }

        if version.is_empty() {
            debug!("can't add package without version");
            return;
        }

        if find_item(&self.package_references, package_name).is_some() {
            debug!("already have package '{package_name}'");
            return;
        }

        let mut package = XmlElement::new(schema::PACKAGE_REFERENCE_ELEMENT)
            .with_attribute(schema::INCLUDE_ATTRIBUTE, package_name)
            .with_child(XmlElement::new(schema::VERSION_ELEMENT).with_text(version));

        if !include_assets.is_empty() {
            package = package
                .with_child(XmlElement::new(schema::INCLUDE_ASSETS_ELEMENT).with_text(include_assets));
        }

        if !private_assets.is_empty() {
            package = package
                .with_child(XmlElement::new(schema::PRIVATE_ASSETS_ELEMENT).with_text(private_assets));
        }

        self.package_references.push(package);
    }

    /// Insert a target, executed before the compile step, that clears the
    /// ambient analyzer item list. Used to suppress analyzers entirely for
    /// projects without an analyzer configuration file.
    pub fn add_remove_analyzers_target(&mut self) {
        self.assert_mutable("add_remove_analyzers_target");

        let remove_analyzers = XmlElement::new(schema::ANALYZER_ELEMENT)
            .with_attribute(schema::REMOVE_ATTRIBUTE, "@(Analyzer)");

        let item_group = XmlElement::new(schema::ITEM_GROUP_ELEMENT).with_child(remove_analyzers);

        let target = XmlElement::new(schema::TARGET_ELEMENT)
            .with_attribute(schema::NAME_ATTRIBUTE, "RemoveAnalyzers")
            .with_attribute(schema::BEFORE_TARGETS_ATTRIBUTE, "CoreCompile")
            .with_child(item_group);

        Self::insert_target(&mut self.document.root, target);
    }

    /// Sort every category and re-insert the items as fresh item groups, one
    /// per non-empty category, then mark the document as processed.
    pub fn compose(&mut self) {
        assert!(
            self.state == ModifierState::Parsed,
            "compose() requires a parsed, not yet composed modifier"
        );
        self.state = ModifierState::Composed;

        sort_items_by_include(&mut self.compiles);
        sort_items_by_include(&mut self.references);
        sort_items_by_include(&mut self.project_references);
        sort_items_by_include(&mut self.package_references);
        sort_items_by_include(&mut self.analyzers);
        sort_items_by_include(&mut self.additional_files);

        let root = &mut self.document.root;
        Self::insert_item_group(root, std::mem::take(&mut self.compiles));
        Self::insert_item_group(root, std::mem::take(&mut self.references));
        Self::insert_item_group(root, std::mem::take(&mut self.project_references));
        Self::insert_item_group(root, std::mem::take(&mut self.package_references));
        Self::insert_item_group(root, std::mem::take(&mut self.analyzers));
        Self::insert_item_group(root, std::mem::take(&mut self.additional_files));
        Self::insert_item_group(root, std::mem::take(&mut self.other_items));

        self.document
            .prologue
            .push(XmlNode::Comment(PROCESSED_MARKER.to_string()));
    }

    /// Serialized UTF-8 text of the composed document.
    pub fn content(&self) -> Result<String> {
        assert!(
            self.state == ModifierState::Composed,
            "content() requires a composed modifier"
        );

        self.document.to_string_utf8()
    }

    fn assert_mutable(&self, operation: &str) {
        assert!(
            self.state == ModifierState::Parsed,
            "{operation} requires a parsed, not yet composed modifier"
        );
    }

    /// Sort each `PropertyGroup/DefineConstants` list: split on `;`, drop
    /// empty segments, ordinal sort, rejoin.
    fn sort_define_constants(&mut self) {
        for property_group in self
            .document
            .root
            .children_named_mut(schema::PROPERTY_GROUP_ELEMENT)
        {
            for defines_element in property_group.children_named_mut(schema::DEFINE_CONSTANTS_ELEMENT)
            {
                let concatenated = defines_element.text();
                let mut defines: Vec<&str> = concatenated
                    .split(schema::DEFINE_CONSTANTS_SEPARATOR)
                    .filter(|segment| !segment.is_empty())
                    .collect();
                defines.sort_unstable();
                defines_element.set_text(defines.join(schema::DEFINE_CONSTANTS_SEPARATOR_TEXT));
            }
        }
    }

    fn normalize_compile_include_paths(&mut self) {
        for group in self.plain_item_groups_mut() {
            for compile in group.children_named_mut(schema::COMPILE_ELEMENT) {
                if let Some(include_path) = compile.attribute(schema::INCLUDE_ATTRIBUTE) {
                    let normalized = paths::normalize_separators(include_path);
                    compile.set_attribute(schema::INCLUDE_ATTRIBUTE, normalized);
                }
            }
        }
    }

    fn normalize_hint_paths(&mut self) {
        for group in self.plain_item_groups_mut() {
            for reference in group.children_named_mut(schema::REFERENCE_ELEMENT) {
                for hint_path in reference.children_named_mut(schema::HINT_PATH_ELEMENT) {
                    let normalized = paths::normalize_separators(&hint_path.text());
                    hint_path.set_text(normalized);
                }
            }
        }
    }

    /// Attribute-less item groups; groups carrying attributes (conditions,
    /// labels) belong to the build configuration and are never rewritten.
    fn plain_item_groups_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.document
            .root
            .children_named_mut(schema::ITEM_GROUP_ELEMENT)
            .filter(|group| group.has_no_attributes())
    }

    fn take_items(&mut self, item_name: &str) -> Vec<XmlElement> {
        let mut items = Vec::new();
        for group in self.plain_item_groups_mut() {
            items.extend(group.take_children_named(item_name));
        }
        items
    }

    fn take_remaining_items(&mut self) -> Vec<XmlElement> {
        let mut items = Vec::new();
        for group in self.plain_item_groups_mut() {
            items.extend(group.take_child_elements());
        }
        items
    }

    fn remove_empty_item_groups(&mut self) {
        self.document.root.children.retain(|node| {
            !matches!(
                node,
                XmlNode::Element(element)
                    if element.name == schema::ITEM_GROUP_ELEMENT && element.is_empty_element()
            )
        });
    }

    /// Insert a fresh item group after the last existing item group, else
    /// after the last property group, else as the first child.
    fn insert_item_group(root: &mut XmlElement, items: Vec<XmlElement>) {
        if items.is_empty() {
            return;
        }

        let item_group = create_element_with_items(schema::ITEM_GROUP_ELEMENT, items);

        let insert_at = match Self::item_group_anchor(root) {
            Some(anchor) => anchor + 1,
            None => 0,
        };

        root.children.insert(insert_at, XmlNode::Element(item_group));
    }

    /// Insert a target after the last existing target, else at the item-group
    /// anchor point.
    fn insert_target(root: &mut XmlElement, target: XmlElement) {
        let anchor = root
            .last_child_index_named(schema::TARGET_ELEMENT)
            .or_else(|| Self::item_group_anchor(root));

        let insert_at = match anchor {
            Some(anchor) => anchor + 1,
            None => 0,
        };

        root.children.insert(insert_at, XmlNode::Element(target));
    }

    fn item_group_anchor(root: &XmlElement) -> Option<usize> {
        root.last_child_index_named(schema::ITEM_GROUP_ELEMENT)
            .or_else(|| root.last_child_index_named(schema::PROPERTY_GROUP_ELEMENT))
    }
}

/// Position of the item whose `Include` equals `include` case-insensitively.
/// Items without an `Include` attribute never match.
fn find_item(items: &[XmlElement], include: &str) -> Option<usize> {
    items.iter().position(|item| {
        item.attribute(schema::INCLUDE_ATTRIBUTE)
            .is_some_and(|value| !value.is_empty() && value.eq_ignore_ascii_case(include))
    })
}

/// Ordinal sort by `Include`; items without the attribute sort first.
/// Intentionally case-sensitive even though duplicate detection is not.
fn sort_items_by_include(items: &mut [XmlElement]) {
    items.sort_by(|left, right| {
        left.attribute(schema::INCLUDE_ATTRIBUTE)
            .cmp(&right.attribute(schema::INCLUDE_ATTRIBUTE))
    });
}
