use crate::models::TodayResponse;

pub fn render_index(today: &TodayResponse) -> String {
    let tasks: String = today
        .tasks
        .iter()
        .map(|task| {
            let (class, mark) = if task.completed { ("task done", "&#10003;") } else { ("task", "") };
            format!(
                r#"<form class="{class}" method="post" action="/tasks/{id}/toggle"><button type="submit"><span class="check">{mark}</span>{label}</button></form>"#,
                id = escape_html(&task.id),
                label = escape_html(&task.label),
            )
        })
        .collect();

    INDEX_HTML
        .replace("{{DATE}}", &today.date)
        .replace("{{PERCENT}}", &today.completion_percent.to_string())
        .replace("{{STREAK}}", &today.streak.to_string())
        .replace("{{FASTING}}", if today.fasting_today { "checked" } else { "" })
        .replace("{{TASKS}}", &tasks)
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Ramadan Companion</title>
  <style>
    :root {
      --bg: #f6f4fb;
      --ink: #1e1b2e;
      --muted: #6b6880;
      --card: #ffffff;
      --accent: #7c3aed;
      --band-0: #f1f5f9;
      --band-1: #ddd6fe;
      --band-2: #a78bfa;
      --band-3: #7c3aed;
      --band-4: #5b21b6;
      --shadow: 0 18px 48px rgba(76, 29, 149, 0.12);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: var(--bg);
      color: var(--ink);
      font-family: "Segoe UI", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: start center;
      padding: 28px 16px 48px;
    }

    .app {
      width: min(720px, 100%);
      display: grid;
      gap: 20px;
    }

    .card {
      background: var(--card);
      border-radius: 24px;
      box-shadow: var(--shadow);
      padding: 24px;
    }

    h1, h2 {
      margin: 0 0 6px;
    }

    .muted {
      color: var(--muted);
      font-size: 0.9rem;
      margin: 0;
    }

    .summary {
      display: grid;
      grid-template-columns: repeat(3, 1fr);
      gap: 12px;
      text-align: center;
    }

    .summary strong {
      display: block;
      font-size: 1.8rem;
      color: var(--accent);
    }

    .task button {
      width: 100%;
      display: flex;
      align-items: center;
      gap: 12px;
      border: none;
      background: transparent;
      padding: 12px;
      border-radius: 14px;
      font: inherit;
      cursor: pointer;
      text-align: left;
    }

    .task button:hover {
      background: #f8fafc;
    }

    .task.done button {
      background: #f5f3ff;
      color: #94a3b8;
      text-decoration: line-through;
    }

    .check {
      width: 22px;
      height: 22px;
      border-radius: 50%;
      border: 2px solid var(--muted);
      display: grid;
      place-items: center;
      font-size: 0.75rem;
      color: #fff;
    }

    .task.done .check {
      background: var(--accent);
      border-color: var(--accent);
    }

    .heatmap {
      display: flex;
      flex-wrap: wrap;
      gap: 8px;
      justify-content: center;
    }

    .cell {
      width: 20px;
      height: 20px;
      border-radius: 6px;
      background: var(--band-0);
    }

    .cell.na {
      opacity: 0.35;
      outline: 1px dashed var(--muted);
    }

    .band-1 { background: var(--band-1); }
    .band-2 { background: var(--band-2); }
    .band-3 { background: var(--band-3); }
    .band-4 { background: var(--band-4); }

    .prayers {
      display: grid;
      grid-template-columns: repeat(6, 1fr);
      gap: 6px;
      text-align: center;
      font-size: 0.85rem;
    }

    .prayers .next {
      color: var(--accent);
      font-weight: 600;
    }

    .status {
      min-height: 1.2em;
      font-size: 0.85rem;
      color: var(--muted);
    }

    .status.error {
      color: #dc2626;
    }
  </style>
</head>
<body>
  <main class="app">
    <section class="card">
      <h1>Ramadan Companion</h1>
      <p class="muted" id="hijri">Today is {{DATE}}</p>
      <p class="muted" id="next-prayer"></p>
      <div class="prayers" id="prayers"></div>
    </section>

    <section class="card summary">
      <div><strong id="percent">{{PERCENT}}%</strong><span class="muted">completed today</span></div>
      <div><strong id="streak">{{STREAK}}</strong><span class="muted">day fasting streak</span></div>
      <div>
        <label><input type="checkbox" id="fasting" {{FASTING}} /> Fasting today</label>
      </div>
    </section>

    <section class="card">
      <h2>Daily Checklist</h2>
      <p class="muted">Ramadan activity for {{DATE}}</p>
      <div id="tasks">{{TASKS}}</div>
    </section>

    <section class="card" id="last-read-card" hidden>
      <h2>Last Read</h2>
      <p class="muted" id="last-read"></p>
    </section>

    <section class="card">
      <h2>Ramadan Consistency</h2>
      <p class="muted">Last 30 days</p>
      <div class="heatmap" id="heatmap"></div>
    </section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const statusEl = document.getElementById('status');
    const fastingEl = document.getElementById('fasting');

    const setStatus = (text, tone) => {
      statusEl.textContent = text;
      statusEl.className = `status ${tone || ''}`;
    };

    const request = async (url, options) => {
      const res = await fetch(url, options);
      if (!res.ok) {
        throw new Error((await res.text()) || `Request to ${url} failed`);
      }
      return res.json();
    };

    const renderToday = (today) => {
      document.getElementById('percent').textContent = `${today.completion_percent}%`;
      document.getElementById('streak').textContent = today.streak;
      fastingEl.checked = today.fasting_today;

      const tasks = document.getElementById('tasks');
      tasks.replaceChildren(...today.tasks.map((task) => {
        const button = document.createElement('button');
        button.type = 'button';
        const check = document.createElement('span');
        check.className = 'check';
        check.textContent = task.completed ? '✓' : '';
        button.append(check, task.label);
        button.addEventListener('click', () => toggle(task.id).catch((err) => setStatus(err.message, 'error')));
        const wrapper = document.createElement('div');
        wrapper.className = task.completed ? 'task done' : 'task';
        wrapper.append(button);
        return wrapper;
      }));
    };

    const renderHeatmap = (cells) => {
      const heatmap = document.getElementById('heatmap');
      heatmap.replaceChildren(...cells.map((cell) => {
        const div = document.createElement('div');
        div.className = cell.applicable ? `cell band-${cell.band}` : 'cell na';
        div.title = cell.applicable ? `${cell.date}: ${cell.value}%` : `${cell.date}: not yet`;
        return div;
      }));
    };

    const renderPrayers = (summary) => {
      document.getElementById('hijri').textContent = summary.hijri;
      if (summary.next) {
        document.getElementById('next-prayer').textContent =
          `${summary.next.label}: ${summary.next.name} at ${summary.next.time} (in ${summary.next.remaining})`;
      }
      const names = ['Imsak', 'Fajr', 'Dhuhr', 'Asr', 'Maghrib', 'Isha'];
      document.getElementById('prayers').replaceChildren(...names.map((name) => {
        const div = document.createElement('div');
        div.className = summary.next && summary.next.name === name ? 'next' : '';
        div.textContent = `${name} ${summary.timings[name]}`;
        return div;
      }));
    };

    const renderBookmark = (bookmark) => {
      const progress = bookmark.progressPercent === undefined ? '' : ` (${bookmark.progressPercent}%)`;
      document.getElementById('last-read').textContent =
        `${bookmark.surahName}, ayah ${bookmark.ayahNumber}${progress}`;
      document.getElementById('last-read-card').hidden = false;
    };

    const loadBookmark = async () => {
      const res = await fetch('/api/bookmark');
      if (res.ok) {
        renderBookmark(await res.json());
      }
    };

    const refresh = async () => {
      const [today, heatmap] = await Promise.all([
        request('/api/today'),
        request('/api/heatmap'),
      ]);
      renderToday(today);
      renderHeatmap(heatmap);
    };

    const toggle = async (taskId) => {
      renderToday(await request('/api/tasks/toggle', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ task_id: taskId })
      }));
    };

    fastingEl.addEventListener('change', () => {
      request('/api/fasting', {
        method: 'POST',
        headers: { 'content-type': 'application/json' },
        body: JSON.stringify({ fasted: fastingEl.checked })
      }).then(renderToday).catch((err) => setStatus(err.message, 'error'));
    });

    const events = new EventSource('/api/events');
    events.addEventListener('ledger', (event) => {
      if (JSON.parse(event.data).kind === 'bookmark') {
        loadBookmark().catch((err) => setStatus(err.message, 'error'));
        return;
      }
      refresh().catch((err) => setStatus(err.message, 'error'));
    });

    refresh().catch((err) => setStatus(err.message, 'error'));
    loadBookmark().catch((err) => setStatus(err.message, 'error'));
    request('/api/prayer-times')
      .then(renderPrayers)
      .catch((err) => setStatus(`Prayer times unavailable: ${err.message}`, 'error'));
  </script>
</body>
</html>
"#;
