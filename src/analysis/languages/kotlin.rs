//! Kotlin analyzer. No bundled grammar; always heuristic.

use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::language::Language;
use crate::analysis::model::AnalysisModel;
use crate::analysis::rules::{
    add_tables, count_matches, detect_frameworks, detect_patterns, parent_module, FrameworkRule,
    PatternRule,
};
use crate::analysis::traits::{Fidelity, LanguageAnalyzer, SourceUnit};

/// Import roots belonging to the platform rather than the project.
const PLATFORM_ROOTS: &[&str] = &["java", "javax", "kotlin"];

lazy_static! {
    static ref PACKAGE: Regex = Regex::new(r"(?m)^\s*package\s+([\w.]+)").unwrap();
    static ref IMPORT: Regex = Regex::new(r"(?m)^\s*import\s+([\w.]+)").unwrap();
    static ref TYPE_DECL: Regex = Regex::new(
        r"(?m)^\s*(?:(?:public|private|protected|internal|open|abstract|data|sealed|enum|annotation|inline|value)\s+)*(?:class|interface|object)\s+\w+"
    )
    .unwrap();
    static ref TOP_LEVEL_OBJECT: Regex = Regex::new(r"(?m)^\s*object\s+\w+").unwrap();
    static ref SPRING_MAPPING: Regex = Regex::new(
        r#"@(Get|Post|Put|Patch|Delete|Request)Mapping\s*\(\s*(?:value\s*=\s*|path\s*=\s*)?\[?\s*["']([^"']+)["']"#
    )
    .unwrap();
    static ref KTOR_ROUTE: Regex =
        Regex::new(r#"\b(get|post|put|patch|delete)\s*\(\s*"([^"]+)"\s*\)\s*\{"#).unwrap();
    static ref RETROFIT_ROUTE: Regex =
        Regex::new(r#"@(GET|POST|PUT|PATCH|DELETE)\(\s*"([^"]+)"\s*\)"#).unwrap();
    static ref JPA_TABLE: Regex =
        Regex::new(r#"@Table\s*\(\s*name\s*=\s*["'](\w+)["']"#).unwrap();
    static ref EXPOSED_TABLE: Regex =
        Regex::new(r"(?m)^\s*object\s+(\w+)\s*:\s*(?:Int|Long|UUID)?(?:Id)?Table\b").unwrap();
    static ref ROOM_ENTITY: Regex = Regex::new(r"(?s)@Entity.*?\bclass\s+(\w+)").unwrap();
}

const FRAMEWORKS: &[FrameworkRule] = &[
    FrameworkRule {
        name: "Spring Boot",
        markers: &["@SpringBootApplication", "import org.springframework.boot"],
    },
    FrameworkRule {
        name: "Spring MVC",
        markers: &["@RestController", "@Controller", "import org.springframework.web"],
    },
    FrameworkRule {
        name: "Spring Service",
        markers: &["@Service", "import org.springframework.stereotype"],
    },
    FrameworkRule {
        name: "Spring Data",
        markers: &["@Repository", "JpaRepository", "CrudRepository"],
    },
    FrameworkRule {
        name: "Jakarta Persistence (JPA)",
        markers: &["import jakarta.persistence", "import javax.persistence"],
    },
    FrameworkRule { name: "Hibernate", markers: &["import org.hibernate"] },
    FrameworkRule { name: "Spring Transaction", markers: &["@Transactional"] },
    FrameworkRule { name: "Spring Security", markers: &["import org.springframework.security"] },
    FrameworkRule { name: "Spring WebFlux (Reactive)", markers: &["WebFlux", "Mono<", "Flux<"] },
    FrameworkRule { name: "Ktor", markers: &["import io.ktor", "embeddedServer", "routing {"] },
    FrameworkRule { name: "Vert.x", markers: &["import io.vertx", "Verticle"] },
    FrameworkRule { name: "Exposed (Kotlin ORM)", markers: &["import org.jetbrains.exposed"] },
    FrameworkRule {
        name: "Kotlin Coroutines",
        markers: &["suspend fun", "import kotlinx.coroutines", "runBlocking"],
    },
    FrameworkRule { name: "Arrow (Functional)", markers: &["import arrow."] },
    FrameworkRule { name: "Koin (DI)", markers: &["import org.koin", "startKoin"] },
    FrameworkRule { name: "Dagger/Hilt (DI)", markers: &["import dagger"] },
    FrameworkRule { name: "Android Jetpack", markers: &["import androidx."] },
    FrameworkRule { name: "Jetpack Compose", markers: &["@Composable", "import androidx.compose"] },
    FrameworkRule { name: "Room (Android DB)", markers: &["import androidx.room"] },
    FrameworkRule {
        name: "Android Architecture Components",
        markers: &["ViewModel", "LiveData<", "StateFlow<"],
    },
    FrameworkRule { name: "Retrofit", markers: &["import retrofit2"] },
    FrameworkRule { name: "OkHttp", markers: &["import okhttp3", "OkHttpClient"] },
    FrameworkRule { name: "kotlinx.serialization", markers: &["kotlinx.serialization", "@Serializable"] },
    FrameworkRule { name: "Jackson", markers: &["import com.fasterxml.jackson", "ObjectMapper"] },
    FrameworkRule { name: "Gson", markers: &["import com.google.gson", "Gson()"] },
    FrameworkRule { name: "Kotest", markers: &["import io.kotest", "FunSpec(", "DescribeSpec("] },
    FrameworkRule { name: "MockK", markers: &["import io.mockk", "mockk<"] },
    FrameworkRule { name: "JUnit", markers: &["import org.junit", "@Test"] },
    FrameworkRule { name: "AssertJ", markers: &["import org.assertj"] },
    FrameworkRule { name: "SLF4J", markers: &["import org.slf4j", "LoggerFactory"] },
    FrameworkRule { name: "kotlin-logging", markers: &["import mu.KLogger", "KotlinLogging"] },
    FrameworkRule { name: "GraphQL (Spring for GraphQL)", markers: &["@QueryMapping"] },
];

const PATTERNS: &[PatternRule] = &[
    PatternRule { name: "Singleton (object)", name_hints: &["singleton"], content_markers: &[] },
    PatternRule { name: "Builder", name_hints: &["builder"], content_markers: &[".apply {"] },
    PatternRule { name: "Strategy", name_hints: &["strategy", "policy"], content_markers: &[] },
    PatternRule {
        name: "Observer / Event",
        name_hints: &["event", "listener"],
        content_markers: &["EventBus", "SharedFlow"],
    },
    PatternRule { name: "Repository", name_hints: &["repository", "repo"], content_markers: &[] },
    PatternRule { name: "Service Layer", name_hints: &["service"], content_markers: &[] },
    PatternRule {
        name: "MVC Controller",
        name_hints: &["controller"],
        content_markers: &["@RestController", "@Controller"],
    },
    PatternRule {
        name: "Sealed Class (ADT)",
        name_hints: &[],
        content_markers: &["sealed class", "sealed interface"],
    },
    PatternRule {
        name: "Delegate / Decorator",
        name_hints: &["decorator", "delegate"],
        content_markers: &["by lazy"],
    },
    PatternRule { name: "DTO/Data class", name_hints: &[], content_markers: &["data class"] },
    PatternRule { name: "Use Case", name_hints: &["usecase", "use_case"], content_markers: &[] },
    PatternRule { name: "ViewModel (MVVM)", name_hints: &["viewmodel"], content_markers: &["ViewModel()"] },
    PatternRule { name: "Mapper", name_hints: &["mapper"], content_markers: &[] },
];

pub struct KotlinAnalyzer;

impl KotlinAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn detect_special_patterns(&self, unit: &SourceUnit, model: &mut AnalysisModel) {
        let content = unit.content.as_str();
        let name = unit.unit_name();
        let lower = unit.file_name().to_ascii_lowercase();

        if TOP_LEVEL_OBJECT.is_match(content) && !lower.contains("singleton") {
            model.add_pattern("Singleton (object)", name);
        }
        if lower.contains("factory")
            || (content.contains("companion object") && content.contains("fun create("))
        {
            model.add_pattern("Factory", name);
        }
        if content.contains("suspend fun") && lower.contains("service") {
            model.add_pattern("Coroutine Service", name);
        }
    }

    fn analyze_endpoints(&self, content: &str, model: &mut AnalysisModel) {
        for caps in SPRING_MAPPING.captures_iter(content) {
            let method = match &caps[1] {
                "Request" => "REQUEST".to_string(),
                other => other.to_ascii_uppercase(),
            };
            model.add_endpoint(format!("{} {} (Spring MVC)", method, &caps[2]));
        }
        if content.contains("routing") || content.contains("io.ktor") {
            for caps in KTOR_ROUTE.captures_iter(content) {
                model.add_endpoint(format!("{} {} (Ktor)", caps[1].to_ascii_uppercase(), &caps[2]));
            }
        }
        for caps in RETROFIT_ROUTE.captures_iter(content) {
            model.add_endpoint(format!("{} {} (Retrofit)", &caps[1], &caps[2]));
        }
    }

    fn analyze_schemas(&self, content: &str, model: &mut AnalysisModel) {
        add_tables(&JPA_TABLE, content, "JPA Entity", model);
        add_tables(&EXPOSED_TABLE, content, "Exposed", model);
        if content.contains("androidx.room") {
            add_tables(&ROOM_ENTITY, content, "Room", model);
        }
    }
}

impl Default for KotlinAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for KotlinAnalyzer {
    fn language(&self) -> Language {
        Language::Kotlin
    }

    fn analyze(&self, unit: &SourceUnit, model: &mut AnalysisModel) -> Fidelity {
        let content = unit.content.as_str();
        let package = PACKAGE
            .captures(content)
            .map(|c| c[1].to_string())
            .unwrap_or_else(|| parent_module(unit.directory()).to_string());
        model.add_package(package.as_str());
        model.add_classes(count_matches(&TYPE_DECL, content));

        for caps in IMPORT.captures_iter(content) {
            let imported = &caps[1];
            let root = imported.split('.').next().unwrap_or(imported);
            if !PLATFORM_ROOTS.contains(&root) {
                model.add_dependency(package.as_str(), imported, "import");
            }
        }

        detect_frameworks(content, FRAMEWORKS, model);
        if unit.file_name().ends_with(".kts") && content.contains("plugins {") {
            model.add_framework("Gradle Kotlin DSL");
        }
        detect_patterns(unit.file_name(), unit.unit_name(), content, PATTERNS, model);
        self.detect_special_patterns(unit, model);
        self.analyze_endpoints(content, model);
        self.analyze_schemas(content, model);

        Fidelity::Heuristic
    }
}
