//! Fixed MSBuild vocabulary shared by the modifier and processor.
//!
//! These names and the namespace URI are part of the wire contract with the
//! build tool; they must match byte-for-byte.

pub const ADDITIONAL_FILES_ELEMENT: &str = "AdditionalFiles";
pub const ANALYZER_ELEMENT: &str = "Analyzer";
pub const COMPILE_ELEMENT: &str = "Compile";
pub const DEFINE_CONSTANTS_ELEMENT: &str = "DefineConstants";
pub const HINT_PATH_ELEMENT: &str = "HintPath";
pub const INCLUDE_ASSETS_ELEMENT: &str = "IncludeAssets";
pub const ITEM_GROUP_ELEMENT: &str = "ItemGroup";
pub const PACKAGE_REFERENCE_ELEMENT: &str = "PackageReference";
pub const PRIVATE_ASSETS_ELEMENT: &str = "PrivateAssets";
pub const PROJECT_REFERENCE_ELEMENT: &str = "ProjectReference";
pub const PROPERTY_GROUP_ELEMENT: &str = "PropertyGroup";
pub const REFERENCE_ELEMENT: &str = "Reference";
pub const TARGET_ELEMENT: &str = "Target";
pub const VERSION_ELEMENT: &str = "Version";

pub const BEFORE_TARGETS_ATTRIBUTE: &str = "BeforeTargets";
pub const INCLUDE_ATTRIBUTE: &str = "Include";
pub const NAME_ATTRIBUTE: &str = "Name";
pub const REMOVE_ATTRIBUTE: &str = "Remove";
pub const XMLNS_ATTRIBUTE: &str = "xmlns";

pub const DEFINE_CONSTANTS_SEPARATOR: char = ';';
pub const DEFINE_CONSTANTS_SEPARATOR_TEXT: &str = ";";

pub const MSBUILD_NAMESPACE: &str = "http://schemas.microsoft.com/developer/msbuild/2003";
