//! Prompt text for every stage, in both research languages.
//!
//! Prompts ask for the most recent information available; the current year
//! is passed in so the wording never goes stale.

use deepresearch_shared::{Language, Link, Summary};

/// System message sent with every completion.
pub fn system_text(language: Language, year: i32) -> String {
    match language {
        Language::Ru => format!(
            "Ты профессиональный исследователь. Текущий год: {year}. Твоя задача:\n\
             1. Собирать актуальную информацию (приоритет {prev}-{year} гг.)\n\
             2. Анализировать информацию\n\
             3. Составлять исследовательский отчет\n\
             Следи за точностью, актуальностью и своевременностью информации. \
             Сосредоточься на последних разработках и тенденциях.",
            prev = year - 1
        ),
        Language::En => format!(
            "You are a professional researcher. Current year: {year}. Your tasks are to:\n\
             1. Collect relevant and current information (prioritize {prev}-{year} data)\n\
             2. Analyze the information with focus on recent developments\n\
             3. Generate research reports with current context\n\
             Ensure the accuracy, relevance and timeliness of the information.",
            prev = year - 1
        ),
    }
}

/// Heading that opens every report.
pub fn report_title(language: Language, topic: &str) -> String {
    match language {
        Language::Ru => format!("# Исследовательский отчет по теме: {topic}"),
        Language::En => format!("# Research report: {topic}"),
    }
}

/// Ask for search queries in both Russian and English.
pub fn queries(language: Language, topic: &str, year: i32) -> String {
    let prev = year - 1;
    match language {
        Language::Ru => format!(
            "ВАЖНО: Сейчас {year} год. Ищи актуальную информацию за {prev}-{year} годы.\n\
             Сгенерируй 3-5 поисковых запросов по теме: {topic} на русском языке и 3-5 на английском языке. \
             Включи в запросы слова '{prev}', '{year}', 'latest', 'recent' для поиска свежей информации. \
             Ответь только одним JSON-массивом строк, без пояснений и без markdown. \
             Пример: [\"русский запрос 1 {year}\", \"english query 1 {year}\"]"
        ),
        Language::En => format!(
            "IMPORTANT: the current year is {year}. Look for information from {prev}-{year}.\n\
             Generate 3-5 search queries on the topic: {topic} in English and 3-5 in Russian. \
             Include words such as '{prev}', '{year}', 'latest', 'recent' to find fresh information. \
             Reply with a single JSON array of strings only, no explanations and no markdown. \
             Example: [\"english query 1 {year}\", \"русский запрос 1 {year}\"]"
        ),
    }
}

/// Condense one page with respect to the topic.
pub fn summarize_page(language: Language, topic: &str, page_text: &str, year: i32) -> String {
    let prev = year - 1;
    match language {
        Language::Ru => format!(
            "ВАЖНО: Сейчас {year} год. Фокусируйся на информации {prev}-{year} годов.\n\
             Сделай сжатую, но максимально информативную выжимку только по теме '{topic}' из текста страницы ниже. \
             Укажи даты событий, если они есть. Только ключевые факты, без вступлений и общих фраз. \
             Ответь на русском.\n\
             Текст страницы:\n{page_text}"
        ),
        Language::En => format!(
            "IMPORTANT: the current year is {year}. Focus on {prev}-{year} information.\n\
             Write a concise but information-dense summary of the page text below, covering only the topic '{topic}'. \
             Give event dates where present. Key facts only, no introductions or filler. \
             Answer in English.\n\
             Page text:\n{page_text}"
        ),
    }
}

/// Ask for a JSON array of section titles built from the summaries.
pub fn outline(
    language: Language,
    topic: &str,
    summaries: &[Summary],
    max_sections: usize,
    year: i32,
) -> String {
    let bullets = summaries
        .iter()
        .map(|s| format!("- {}", s.text))
        .collect::<Vec<_>>()
        .join("\n");

    match language {
        Language::Ru => format!(
            "ВАЖНО: Сейчас {year} год. План должен отражать актуальное состояние на {year} год.\n\
             На основе темы '{topic}' и кратких выжимок с разных страниц составь логичный, структурированный план \
             исследовательского отчета. Включи разделы о текущем состоянии, трендах и перспективах. \
             Ответь ТОЛЬКО JSON-массивом строк с названиями разделов, без пояснений и без markdown. \
             Пример: [\"Текущая ситуация на рынке в {year} году\", \"Основные тренды\", \"Прогнозы на будущее\"]\n\n\
             Максимум {max_sections} разделов\n\
             Вот краткие выжимки:\n{bullets}"
        ),
        Language::En => format!(
            "IMPORTANT: the current year is {year}. The outline must reflect the state of things in {year}.\n\
             Based on the topic '{topic}' and the page summaries below, produce a logical, structured outline \
             for a research report. Include sections on the current state, trends and outlook. \
             Reply ONLY with a JSON array of section title strings, no explanations and no markdown. \
             Example: [\"Market landscape in {year}\", \"Key trends\", \"Outlook\"]\n\n\
             At most {max_sections} sections\n\
             Summaries:\n{bullets}"
        ),
    }
}

/// Markdown list of sources, one `- [title](url)` line per link with a URL.
pub fn sources_list(links: &[Link]) -> String {
    links
        .iter()
        .filter_map(|l| {
            let url = l.url.as_deref()?;
            let title = l.title.as_deref().unwrap_or(url);
            Some(format!("- [{title}]({url})"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pipe table of summaries with cells shortened and pipes neutralised.
pub fn summaries_table(summaries: &[Summary]) -> String {
    let cell = |s: &str, max: usize| s.replace(['|', '\n'], " ").chars().take(max).collect::<String>();
    let mut table = String::from("| # | Title | URL | Summary |\n|---|---|---|---|\n");
    for (i, s) in summaries.iter().enumerate() {
        table.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            i + 1,
            cell(s.title.as_deref().unwrap_or(""), 60),
            s.url.as_deref().unwrap_or(""),
            cell(&s.text, 200),
        ));
    }
    table
}

/// Draft the body of one section, steering away from sibling sections.
pub fn section(
    language: Language,
    topic: &str,
    title: &str,
    plan: &str,
    other_titles: &[&str],
    sources: &str,
    table: &str,
    year: i32,
) -> String {
    let others = other_titles
        .iter()
        .map(|t| format!("- {t}"))
        .collect::<Vec<_>>()
        .join("\n");

    match language {
        Language::Ru => format!(
            "Раздел отчета: {title}\n\
             Тема: {topic}\n\
             План отчета:\n{plan}\n\
             ВАЖНО: Текущий год - {year}. Используй актуальную информацию. Если данные устарели, укажи их дату.\n\
             Источники:\n{sources}\n\
             Таблица выжимок:\n{table}\n\
             ВАЖНО: В этом разделе НЕ НУЖНО писать о следующих темах, они будут раскрыты в других разделах:\n{others}\n\n\
             Напиши подробный текст ТОЛЬКО для раздела '{title}', используя только факты из выжимок и источников. \
             Не выдумывай данные. Включай таблицы, если это уместно. \
             НЕ ПИШИ введение или заключение, только основной текст раздела.\n"
        ),
        Language::En => format!(
            "Report section: {title}\n\
             Topic: {topic}\n\
             Report outline:\n{plan}\n\
             IMPORTANT: the current year is {year}. Use current information and date anything outdated.\n\
             Sources:\n{sources}\n\
             Summary table:\n{table}\n\
             IMPORTANT: do NOT cover the following topics here, other sections handle them:\n{others}\n\n\
             Write detailed text ONLY for the section '{title}', using only facts from the summaries and sources. \
             Do not invent data. Include tables where useful. \
             Do NOT write an introduction or conclusion, only the section body.\n"
        ),
    }
}
