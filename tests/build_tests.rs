//! End-to-end build tests
//!
//! Builds the fixture schema into a temp directory and checks the written
//! files, partial handling, cleanup and the build guard.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use models_builder::build::{is_generated_file, BuildGuard, LAST_BUILD_FILE};
use models_builder::codegen::signature;
use models_builder::{
    BuildError, FileSummary, GeneratorSettings, JsonSchemaSource, ModelsBuilder, ModelsGenerator, SourceGenerator,
};
use tempfile::TempDir;
use walkdir::WalkDir;

fn fixture_schema() -> JsonSchemaSource {
    JsonSchemaSource::from_str(include_str!("fixtures/schema.json")).unwrap()
}

fn builder(models_path: &Path) -> ModelsBuilder<JsonSchemaSource> {
    let settings = GeneratorSettings::new("My.Models", models_path);
    ModelsBuilder::new(ModelsGenerator::new(fixture_schema(), settings))
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).unwrap()
}

/// All generated files below `root`, keyed by path
fn generated_files(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().to_string_lossy().ends_with(".generated.cs"))
        .map(|e| (e.path().to_path_buf(), read(e.path())))
        .collect()
}

// =============================================================================
// Layout
// =============================================================================

#[test]
fn test_build_writes_every_type_into_its_directory() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    let report = builder(&root).build_models().unwrap();

    let expected = [
        "Content/Compositions/SeoComposition.generated.cs",
        "Content/Article.generated.cs",
        "Content/BlogPost.generated.cs",
        "Content/LandingPage.generated.cs",
        "Elements/HeroBlock.generated.cs",
        "Media/Image.generated.cs",
        "Members/Person.generated.cs",
    ];
    assert_eq!(report.written.len(), expected.len());
    for file in expected {
        let path = root.join(file);
        assert!(report.written.contains(&path), "missing {}", file);
        assert!(is_generated_file(&path));
    }

    assert!(root.join(LAST_BUILD_FILE).is_file());
    assert!(report.deleted.is_empty());
    assert!(report.skipped.is_empty());
}

#[test]
fn test_blog_post_model() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    builder(&root).build_models().unwrap();

    let source = read(root.join("Content/BlogPost.generated.cs"));
    assert!(source.contains("namespace My.Models.Content {"));
    assert!(source.contains("    [PublishedModel(\"blogPost\")]\n    public partial class BlogPost : PublishedContentModel {"));
    assert!(source.contains("public new const string ModelTypeAlias = \"blogPost\";"));
    assert!(source.contains("public new const PublishedItemType ModelItemType = PublishedItemType.Content;"));
    assert!(source.contains(
        "        public BlogPost(IPublishedContent content, IPublishedValueFallback publishedValueFallback) : base(content, publishedValueFallback) { }"
    ));
    assert!(source.contains(
        "        [ImplementPropertyType(\"title\")]\n        public new string Title\n            => this.Value<string>(\"title\");"
    ));
    assert!(source.contains("public new global::System.Collections.Generic.IEnumerable<string> Tags"));
    assert!(source.contains(
        "public static string Title(this BlogPost content, string culture = null, string segment = null) {\n            return content.Value<string>(\"title\", culture, segment);\n        }"
    ));

    // separator editors are never generated
    assert!(!source.contains("Divider"));
    assert!(!source.contains("#region Static methods"));
}

#[test]
fn test_composition_and_composing_type() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    builder(&root).build_models().unwrap();

    let seo = read(root.join("Content/Compositions/SeoComposition.generated.cs"));
    assert!(seo.contains("namespace My.Models.Content.Compositions {"));
    assert!(seo.contains("    public partial interface ISeoComposition : IPublishedContent {\n\n        string MetaTitle { get; }"));
    assert!(seo.contains("public partial class SeoComposition : PublishedContentModel, ISeoComposition {"));
    assert!(seo.contains("public static string GetMetaTitle(ISeoComposition that)"));
    assert!(seo.contains("public static string MetaTitle(this ISeoComposition content"));

    let article = read(root.join("Content/Article.generated.cs"));
    assert!(article.contains("using My.Models.Content.Compositions;"));
    assert!(article.contains("public partial class Article : PublishedContentModel, ISeoComposition {"));
    assert!(article.contains(
        "public new string MetaTitle\n            => global::My.Models.Content.Compositions.SeoComposition.GetMetaTitle(this);"
    ));
    assert!(article.contains("public new global::My.Models.Members.Person Author"));
    assert!(article.contains("public new global::System.DateTime PublishDate"));
    assert!(!article.contains("public partial interface"));

    // value types never get the MaybeNull hint
    let publish_date = article.find("public static global::System.DateTime PublishDate(this Article").unwrap();
    assert!(!article[..publish_date].trim_end().ends_with("MaybeNull]"));
    let author = article.find("public static global::My.Models.Members.Person Author(this Article").unwrap();
    assert!(article[..author].trim_end().ends_with("MaybeNull]"));
}

#[test]
fn test_child_type_inherits_parent_model() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    builder(&root).build_models().unwrap();

    let source = read(root.join("Content/LandingPage.generated.cs"));
    assert!(source.contains("    [PublishedModel(\"landingPage\")]\n    public partial class LandingPage : BlogPost {"));
    assert!(!source.contains("PublishedContentModel"));
    assert!(source.contains(
        "        [ImplementPropertyType(\"title\")]\n        public new string Title\n            => this.Value<string>(\"title\");"
    ));
    assert!(source.contains("public new string Intro\n            => this.Value<string>(\"intro\");"));
    assert!(!source.contains("Divider"));
}

#[test]
fn test_element_media_and_member_kinds() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    builder(&root).build_models().unwrap();

    let hero = read(root.join("Elements/HeroBlock.generated.cs"));
    assert!(hero.contains("namespace My.Models.Elements {"));
    assert!(hero.contains("public partial class HeroBlock : PublishedElementModel {"));
    assert!(hero.contains("public HeroBlock(IPublishedElement content,"));
    assert!(hero.contains("PublishedItemType.Element;"));

    let image = read(root.join("Media/Image.generated.cs"));
    assert!(image.contains("namespace My.Models.Media {"));
    assert!(image.contains("PublishedItemType.Media;"));

    let person = read(root.join("Members/Person.generated.cs"));
    assert!(person.contains("namespace My.Models.Members {"));
    assert!(person.contains("PublishedItemType.Member;"));
}

// =============================================================================
// Partials
// =============================================================================

#[test]
fn test_hand_written_partial_suppresses_members() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    fs::create_dir_all(root.join("Content")).unwrap();
    fs::write(
        root.join("Content/BlogPost.cs"),
        r#"using Umbraco.Cms.Core.Models.PublishedContent;

namespace My.Models.Content
{
    [IgnorePropertyType("tags")]
    public partial class BlogPost
    {
        public BlogPost(IPublishedContent content, IPublishedValueFallback publishedValueFallback)
            : base(content, publishedValueFallback)
        {
        }

        public string Title => Name.ToUpperInvariant();
    }
}
"#,
    )
    .unwrap();

    builder(&root).build_models().unwrap();
    let source = read(root.join("Content/BlogPost.generated.cs"));

    assert!(source.contains("public partial class BlogPost : PublishedContentModel {"));
    assert!(!source.contains("#region Constructors"));
    assert!(!source.contains("Title"));
    assert!(!source.contains("Tags"));
    assert!(!source.contains("#region Properties"));
    assert!(!source.contains("BlogPostExtensions"));
}

#[test]
fn test_partial_saved_with_byte_order_mark() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    fs::create_dir_all(root.join("Content")).unwrap();

    let mut partial = vec![0xEF, 0xBB, 0xBF];
    partial.extend_from_slice(
        b"namespace My.Models.Content { public partial class BlogPost { public string Title => \"x\"; } }",
    );
    fs::write(root.join("Content/BlogPost.cs"), partial).unwrap();

    builder(&root).build_models().unwrap();
    let source = read(root.join("Content/BlogPost.generated.cs"));
    assert!(!source.contains("public new string Title"));
    assert!(source.contains("public new global::System.Collections.Generic.IEnumerable<string> Tags"));
}

#[test]
fn test_partial_with_base_class_drops_generated_base() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    fs::create_dir_all(root.join("Content")).unwrap();
    fs::write(
        root.join("Content/Article.cs"),
        "namespace My.Models.Content { public partial class Article : ArticleBase, ISeoComposition { } }",
    )
    .unwrap();

    builder(&root).build_models().unwrap();
    let source = read(root.join("Content/Article.generated.cs"));
    assert!(source.contains("public partial class Article {"));
    assert!(source.contains("#region Constructors"));
}

#[test]
fn test_generated_output_reports_its_constructor() {
    let models_path = PathBuf::from("models");
    let settings = GeneratorSettings::new("My.Models", &models_path);
    let generator = ModelsGenerator::new(fixture_schema(), settings.clone());
    let models = generator.get_models(&settings).unwrap();

    let renderer = SourceGenerator::new(&models, &settings);
    for model in &models {
        let source = renderer.render(model, None).unwrap();
        let summary = FileSummary::parse(&source).unwrap();
        let class = summary.class(&model.full_name()).unwrap();
        assert!(class.has_published_content_constructor(), "{}", model.alias);
    }
}

// =============================================================================
// Rebuilds
// =============================================================================

#[test]
fn test_rebuild_is_byte_identical() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    let builder = builder(&root);

    builder.build_models().unwrap();
    let first = generated_files(&root);
    builder.build_models().unwrap();
    let second = generated_files(&root);

    assert_eq!(first.len(), 7);
    assert_eq!(first, second);
}

#[test]
fn test_clean_build_keeps_unsigned_files() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    let builder = builder(&root);
    builder.build_models().unwrap();

    let stale = root.join("Content/Removed.generated.cs");
    let foreign = root.join("Content/Foreign.generated.cs");
    let partial = root.join("Content/BlogPost.cs");
    fs::write(&stale, format!("// x\n{}0.0.1\n", signature())).unwrap();
    fs::write(&foreign, "// written by another tool\n").unwrap();
    fs::write(&partial, "namespace My.Models.Content { public partial class BlogPost { } }").unwrap();

    let mut settings = builder.generator().default_settings();
    settings.delete_generated_files = true;
    let report = builder.build_models_with(&settings).unwrap();

    assert!(report.deleted.contains(&stale));
    assert!(!stale.exists());
    assert!(foreign.exists());
    assert!(partial.exists());
    assert!(root.join("Content/BlogPost.generated.cs").exists());
}

#[test]
fn test_concurrent_build_for_same_root_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("models");
    let builder = builder(&root);
    let settings = builder.generator().default_settings();

    let guard = BuildGuard::acquire(&settings.models_path_absolute()).unwrap();
    assert!(matches!(builder.build_models(), Err(BuildError::BuildInProgress(_))));

    // other roots are independent
    let other = dir.path().join("other");
    assert!(self::builder(&other).build_models().is_ok());

    drop(guard);
    assert!(builder.build_models().is_ok());
}

#[test]
fn test_unknown_model_alias_fails_build() {
    let schema = r#"{
        "contentTypes": [
            { "id": 1, "alias": "page", "properties": [
                { "alias": "related", "editorAlias": "Umbraco.ContentPicker",
                  "valueType": { "kind": "model", "contentTypeAlias": "missing" } } ] }
        ]
    }"#;
    let dir = TempDir::new().unwrap();
    let settings = GeneratorSettings::new("My.Models", dir.path().join("models"));
    let builder = ModelsBuilder::new(ModelsGenerator::new(JsonSchemaSource::from_str(schema).unwrap(), settings));

    let err = builder.build_models().unwrap_err();
    assert!(matches!(err, BuildError::UnresolvedModelType { ref alias, .. } if alias == "missing"));
}
