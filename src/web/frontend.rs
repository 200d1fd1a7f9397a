//! Embedded HTML/CSS/JS frontend for the worldstats dashboard.
//!
//! The entire SPA is compiled into the binary as a string constant.
//! No external assets, no build tools, no CDN dependencies.

/// The complete single-page dashboard HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>WorldData Hub</title>
<style>
:root {
  --bg: #020617;
  --surface: #0f172a;
  --surface-2: #1e293b;
  --border: #1e293b;
  --text: #e2e8f0;
  --text-muted: #64748b;
  --accent: #38bdf8;
  --indigo: #6366f1;
  --green: #10b981;
  --amber: #f59e0b;
  --red: #f85149;
  --radius: 14px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

/* Layout */
header {
  position: sticky;
  top: 0;
  z-index: 10;
  background: rgba(2, 6, 23, 0.85);
  backdrop-filter: blur(12px);
  border-bottom: 1px solid var(--border);
}

.bar {
  max-width: 1200px;
  margin: 0 auto;
  padding: 12px 24px;
  display: flex;
  align-items: center;
  justify-content: space-between;
}

.brand { display: flex; align-items: center; gap: 12px; }
.brand .logo {
  width: 40px; height: 40px;
  border-radius: 12px;
  background: linear-gradient(45deg, #0284c7, var(--indigo));
  display: flex; align-items: center; justify-content: center;
  font-size: 20px;
}
.brand h1 { font-size: 18px; font-weight: 700; color: #fff; line-height: 1; }
.brand h1 span { color: var(--accent); }
.brand .subtitle {
  font-size: 10px;
  color: var(--text-muted);
  font-weight: 700;
  letter-spacing: 0.12em;
  text-transform: uppercase;
  margin-top: 4px;
}

main {
  max-width: 1200px;
  margin: 0 auto;
  padding: 32px 24px;
}

/* Navigation */
nav {
  display: flex;
  gap: 4px;
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: 12px;
  padding: 4px;
}

nav button {
  padding: 8px 16px;
  border: none;
  border-radius: 8px;
  background: transparent;
  color: var(--text-muted);
  font-size: 12px;
  font-weight: 700;
  cursor: pointer;
  transition: all 0.15s;
}

nav button:hover { color: var(--text); }
nav button.active { background: var(--surface-2); color: #fff; }
nav button.active[data-view="generator"] { background: #0284c7; }

.view { display: none; }
.view.active { display: block; }

/* Controls */
.controls {
  display: grid;
  grid-template-columns: 2fr 1fr;
  gap: 24px;
  margin-bottom: 32px;
}

.filters { display: flex; gap: 12px; margin-bottom: 12px; }

input[type="text"], select {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: 12px;
  color: var(--text);
  padding: 12px 16px;
  font-size: 14px;
  outline: none;
}
input[type="text"] { flex: 1; }
input[type="text"]:focus, select:focus { border-color: rgba(56, 189, 248, 0.5); }
select { text-transform: capitalize; }

.badges { display: flex; flex-wrap: wrap; gap: 8px; }

.badge {
  display: inline-flex;
  align-items: center;
  gap: 6px;
  padding: 4px 12px;
  border-radius: 999px;
  font-size: 10px;
  font-weight: 700;
  border: 1px solid var(--border);
  background: var(--surface-2);
  color: #94a3b8;
}
.badge .dot { width: 6px; height: 6px; border-radius: 50%; background: currentColor; }
.badge.live { color: var(--green); border-color: rgba(16, 185, 129, 0.2); background: rgba(16, 185, 129, 0.1); }
.badge.sim { color: var(--amber); border-color: rgba(245, 158, 11, 0.2); background: rgba(245, 158, 11, 0.1); }
.badge.sim .dot { animation: pulse 1.2s infinite; }
.badge.err { color: var(--red); border-color: var(--red); }

.panel {
  background: rgba(15, 23, 42, 0.4);
  border: 1px solid var(--border);
  border-radius: 18px;
  padding: 16px;
  display: flex;
  flex-direction: column;
  justify-content: space-between;
}
.panel .head {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 16px;
}
.panel .title {
  font-size: 10px;
  font-weight: 700;
  color: var(--text-muted);
  text-transform: uppercase;
  letter-spacing: 0.12em;
}

/* Buttons */
.btn {
  padding: 8px 12px;
  border: none;
  border-radius: 8px;
  background: var(--surface-2);
  color: #cbd5e1;
  font-size: 11px;
  font-weight: 800;
  cursor: pointer;
  text-transform: uppercase;
  transition: all 0.15s;
}
.btn:hover { background: #334155; }
.btn.on { background: #0ea5e9; color: #fff; }
.btn.wide {
  width: 100%;
  background: #fff;
  color: #020617;
  padding: 10px;
  border-radius: 12px;
}
.btn.wide:hover { background: var(--accent); }
.btn .spin { display: inline-block; }
.btn.busy .spin { animation: spin 0.8s linear infinite; }

/* Cards */
.grid {
  display: grid;
  grid-template-columns: repeat(auto-fill, minmax(240px, 1fr));
  gap: 16px;
}

.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 18px;
  min-height: 128px;
  transition: border-color 0.3s, opacity 0.3s;
}
.card:hover { border-color: #334155; }
.card.updating { opacity: 0.6; }
.card.changed { border-color: var(--accent); box-shadow: 0 0 0 1px rgba(56, 189, 248, 0.3); }
.card .cat {
  font-size: 10px;
  font-weight: 700;
  color: var(--text-muted);
  text-transform: uppercase;
  letter-spacing: 0.08em;
  display: flex;
  gap: 6px;
  align-items: center;
}
.card .label { margin-top: 10px; color: #94a3b8; font-size: 13px; }
.card .value {
  margin-top: 6px;
  font-size: 22px;
  font-weight: 700;
  color: #fff;
  font-family: var(--mono);
  word-break: break-all;
}
.card .value.flash { color: var(--accent); }

.skeleton {
  height: 128px;
  border-radius: var(--radius);
  background: var(--surface);
  border: 1px solid var(--border);
  animation: pulse 1.5s infinite;
}

.empty {
  text-align: center;
  padding: 80px 0;
  border: 1px dashed var(--border);
  border-radius: 24px;
  color: var(--text-muted);
}

/* Generator */
.gen { max-width: 900px; margin: 0 auto; }
.gen h2 { font-size: 24px; color: #fff; }
.gen .lead { color: var(--text-muted); margin-bottom: 24px; }
.gen .explain {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
  margin-bottom: 16px;
}
.gen .libs { display: flex; gap: 6px; flex-wrap: wrap; margin-top: 12px; }
.gen .libs span {
  font-family: var(--mono);
  font-size: 11px;
  padding: 2px 8px;
  border-radius: 6px;
  background: var(--surface-2);
  color: var(--accent);
}
.code {
  position: relative;
  background: #0b1120;
  border: 1px solid var(--border);
  border-radius: var(--radius);
}
.code .head {
  display: flex;
  justify-content: space-between;
  align-items: center;
  padding: 10px 16px;
  border-bottom: 1px solid var(--border);
  font-size: 11px;
  color: var(--text-muted);
  font-family: var(--mono);
}
.code pre {
  padding: 16px;
  overflow: auto;
  max-height: 560px;
  font-family: var(--mono);
  font-size: 12px;
  line-height: 1.6;
  color: #cbd5e1;
}
.spinner {
  width: 32px; height: 32px;
  margin: 160px auto;
  border: 2px solid var(--accent);
  border-top-color: transparent;
  border-radius: 50%;
  animation: spin 0.8s linear infinite;
}

/* Toast */
.toast {
  position: fixed;
  bottom: 24px;
  right: 24px;
  padding: 12px 20px;
  border-radius: 8px;
  background: var(--green);
  color: #fff;
  font-size: 13px;
  opacity: 0;
  transform: translateY(10px);
  transition: all 0.3s;
  pointer-events: none;
}
.toast.show { opacity: 1; transform: translateY(0); }
.toast.error { background: var(--red); }

@keyframes spin { to { transform: rotate(360deg); } }
@keyframes pulse { 50% { opacity: 0.5; } }

@media (max-width: 800px) {
  .controls { grid-template-columns: 1fr; }
  .filters { flex-direction: column; }
}
</style>
</head>
<body>

<header>
  <div class="bar">
    <div class="brand">
      <div class="logo">📊</div>
      <div>
        <h1>WorldData <span>Hub</span></h1>
        <div class="subtitle">Global Intelligence Scraper</div>
      </div>
    </div>
    <div class="badges" id="health-badges"></div>
    <nav id="nav">
      <button class="active" data-view="dashboard">DASHBOARD</button>
      <button data-view="generator">PYTHON API</button>
    </nav>
  </div>
</header>

<main>
  <!-- Dashboard -->
  <div class="view active" id="view-dashboard">
    <div class="controls">
      <div>
        <div class="filters">
          <input type="text" id="search" placeholder="Search across 50+ metrics..." autocomplete="off">
          <select id="category"><option value="all">all</option></select>
        </div>
        <div class="badges">
          <span class="badge" id="provenance"><span class="dot"></span><span>LOADING</span></span>
          <span class="badge" id="total">TOTAL METRICS: 0</span>
          <span class="badge" id="updated"></span>
        </div>
      </div>

      <div class="panel">
        <div class="head">
          <span class="title">Data Management</span>
          <div style="display:flex; gap:8px">
            <button class="btn" id="btn-refresh" title="Refresh now"><span class="spin">⟳</span></button>
            <button class="btn" id="btn-live">LIVE: OFF</button>
          </div>
        </div>
        <button class="btn wide" id="btn-export">⤓ Export All Metrics (.csv)</button>
      </div>
    </div>

    <div class="grid" id="grid"></div>
    <div class="empty" id="empty" style="display:none">
      <p>No metrics match your search or category filter.</p>
    </div>
  </div>

  <!-- Generator -->
  <div class="view" id="view-generator">
    <div class="gen">
      <div style="display:flex; justify-content:space-between; align-items:flex-start">
        <div>
          <h2>Python Data Infrastructure</h2>
          <p class="lead">Deploy this script to capture historical trends into your local database.</p>
        </div>
        <button class="btn" id="btn-regenerate">Regenerate</button>
      </div>
      <div id="script"><div class="spinner"></div></div>
    </div>
  </div>
</main>

<!-- Toast -->
<div class="toast" id="toast"></div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let currentView = 'dashboard';
let statsData = null;
let lastVersion = -1;
let statsTimer = null;
let scriptTimer = null;
let searchTimer = null;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  return res.json();
}

function toast(msg, isError) {
  const el = document.getElementById('toast');
  el.textContent = msg;
  el.className = 'toast show' + (isError ? ' error' : '');
  setTimeout(() => el.className = 'toast', 3000);
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------
document.getElementById('nav').addEventListener('click', async e => {
  if (e.target.tagName !== 'BUTTON') return;
  const view = e.target.dataset.view;
  if (!view || view === currentView) return;

  document.querySelectorAll('nav button').forEach(b => b.classList.remove('active'));
  e.target.classList.add('active');
  document.querySelectorAll('.view').forEach(v => v.classList.remove('active'));
  document.getElementById('view-' + view).classList.add('active');
  currentView = view;

  try {
    await api('PUT', '/api/view', { view });
  } catch (err) {
    toast('Failed to switch view: ' + err.message, true);
  }
  if (view === 'generator') loadScript();
});

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------
function statsUrl() {
  const q = document.getElementById('search').value;
  const category = document.getElementById('category').value;
  return '/api/stats?q=' + encodeURIComponent(q) + '&category=' + encodeURIComponent(category);
}

async function loadStats() {
  try {
    statsData = await api('GET', statsUrl());
    if (statsData.error) {
      toast(statsData.error, true);
      return;
    }
    renderDashboard();
  } catch (e) {
    toast('Failed to load stats: ' + e.message, true);
  }
}

function renderDashboard() {
  const s = statsData;
  const fresh = s.version !== lastVersion;
  lastVersion = s.version;

  renderOptions(s.options, s.category);

  const prov = document.getElementById('provenance');
  if (!s.loaded) {
    prov.className = 'badge';
    prov.lastElementChild.textContent = 'LOADING';
  } else if (s.is_fallback) {
    prov.className = 'badge sim';
    prov.lastElementChild.textContent = 'SIMULATED DATA (RATE LIMIT)';
  } else {
    prov.className = 'badge live';
    prov.lastElementChild.textContent = 'LIVE FROM WORLDOMETERS';
  }
  document.getElementById('total').textContent = 'TOTAL METRICS: ' + s.total;
  document.getElementById('updated').textContent = s.updated_at
    ? 'UPDATED ' + new Date(s.updated_at).toLocaleTimeString()
    : 'NOT LOADED';

  document.getElementById('btn-refresh').classList.toggle('busy', s.updating);
  const live = document.getElementById('btn-live');
  live.textContent = s.live ? 'LIVE: ON' : 'LIVE: OFF';
  live.classList.toggle('on', s.live);

  const grid = document.getElementById('grid');
  const empty = document.getElementById('empty');
  if (!s.loaded) {
    grid.innerHTML = '<div class="skeleton"></div>'.repeat(12);
    empty.style.display = 'none';
    return;
  }

  grid.innerHTML = s.records.map(r => `
    <div class="card ${s.updating ? 'updating' : ''} ${fresh && r.changed ? 'changed' : ''}">
      <div class="cat">${r.icon} ${esc(r.category_name)}</div>
      <div class="label">${esc(r.label)}</div>
      <div class="value ${fresh && r.changed ? 'flash' : ''}">${esc(r.value)}</div>
    </div>`).join('');
  empty.style.display = s.records.length === 0 ? 'block' : 'none';

  if (fresh) {
    setTimeout(() => {
      document.querySelectorAll('.card.changed').forEach(c => c.classList.remove('changed'));
      document.querySelectorAll('.value.flash').forEach(v => v.classList.remove('flash'));
    }, 1000);
  }
}

function renderOptions(options, selected) {
  const select = document.getElementById('category');
  const current = options.map(o => o.value).join(',');
  if (select.dataset.options === current) return;
  select.dataset.options = current;
  select.innerHTML = options.map(o =>
    `<option value="${esc(o.value)}" ${o.value === selected ? 'selected' : ''}>${esc(o.label)}</option>`
  ).join('');
}

document.getElementById('search').addEventListener('input', () => {
  clearTimeout(searchTimer);
  searchTimer = setTimeout(loadStats, 150);
});

document.getElementById('category').addEventListener('change', loadStats);

document.getElementById('btn-refresh').addEventListener('click', async () => {
  document.getElementById('btn-refresh').classList.add('busy');
  try {
    await api('POST', '/api/refresh');
    loadStats();
  } catch (e) {
    toast('Failed to refresh: ' + e.message, true);
  }
});

document.getElementById('btn-live').addEventListener('click', async () => {
  const enabled = !(statsData && statsData.live);
  try {
    const res = await api('PUT', '/api/live', { enabled });
    toast(res.live ? 'Live mode on' : 'Live mode off');
    loadStats();
  } catch (e) {
    toast('Failed to toggle live mode: ' + e.message, true);
  }
});

document.getElementById('btn-export').addEventListener('click', async () => {
  try {
    const res = await fetch('/api/export');
    if (res.status === 204) {
      toast('Nothing to export yet', true);
      return;
    }
    const disposition = res.headers.get('Content-Disposition') || '';
    const match = disposition.match(/filename="([^"]+)"/);
    const blob = await res.blob();
    const url = URL.createObjectURL(blob);
    const link = document.createElement('a');
    link.href = url;
    link.download = match ? match[1] : 'worldometers_full_data.csv';
    link.click();
    URL.revokeObjectURL(url);
  } catch (e) {
    toast('Export failed: ' + e.message, true);
  }
});

// ---------------------------------------------------------------------------
// Script generator
// ---------------------------------------------------------------------------
async function loadScript(force) {
  clearTimeout(scriptTimer);
  try {
    const res = await api('GET', '/api/script' + (force ? '?force=true' : ''));
    if (res.status === 'generating') {
      document.getElementById('script').innerHTML = '<div class="spinner"></div>';
      scriptTimer = setTimeout(() => loadScript(false), 1000);
      return;
    }
    renderScript(res.script, res.status === 'failed');
  } catch (e) {
    toast('Failed to load script: ' + e.message, true);
  }
}

function renderScript(script, failed) {
  document.getElementById('script').innerHTML = `
    <div class="explain">
      <p>${esc(script.explanation)}</p>
      <div class="libs">${script.libraries.map(l => `<span>${esc(l)}</span>`).join('')}</div>
    </div>
    <div class="code">
      <div class="head"><span>scraper.py</span>${failed ? '' : '<button class="btn" id="btn-copy">Copy</button>'}</div>
      <pre>${esc(script.code)}</pre>
    </div>`;
  const copy = document.getElementById('btn-copy');
  if (copy) {
    copy.addEventListener('click', async () => {
      await navigator.clipboard.writeText(script.code);
      toast('Copied to clipboard');
    });
  }
}

document.getElementById('btn-regenerate').addEventListener('click', () => loadScript(true));

// ---------------------------------------------------------------------------
// Health badges
// ---------------------------------------------------------------------------
async function loadHealth() {
  try {
    const h = await api('GET', '/api/health');
    const badges = [
      badge(h.offline ? 'OFFLINE' : h.provider.toUpperCase(), h.offline ? 'sim' : 'live'),
    ];
    if (h.auto_save) {
      badges.push(badge(h.last_saved ? 'AUTO-SAVED ' + h.last_saved : 'AUTO-SAVE ON', 'live'));
    }
    document.getElementById('health-badges').innerHTML = badges.join('');
  } catch (e) {
    // Silently ignore health badge errors
  }
}

function badge(label, cls) {
  return `<span class="badge ${cls}"><span class="dot"></span>${esc(label)}</span>`;
}

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------
function esc(s) {
  if (s === undefined || s === null) return '';
  return String(s).replace(/&/g,'&amp;').replace(/</g,'&lt;').replace(/>/g,'&gt;').replace(/"/g,'&quot;');
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
// The page always opens on the dashboard; the server may still hold the
// view from before a reload.
async function syncView() {
  try {
    await api('PUT', '/api/view', { view: currentView });
  } catch (err) {
    toast('Failed to sync view: ' + err.message, true);
  }
}

loadHealth();
syncView().then(loadStats);
statsTimer = setInterval(() => {
  if (currentView === 'dashboard') loadStats();
}, 1500);
setInterval(loadHealth, 15000);
</script>
</body>
</html>"##;
